pub mod config;
pub mod config_loader;
pub mod recommendation;
pub mod validation;

pub use config::{
    AppConfig, BrokerConfig, BudgetConfig, DatabaseConfig, ExecutionConfig, RetryConfig,
    ServerConfig, TriggerConfig,
};
pub use config_loader::ConfigLoader;
pub use recommendation::{
    OptionType, Recommendation, RecommendationSet, SpreadRecommendation, StockAction,
    StockRecommendation,
};
pub use validation::{validate_recommendations, BudgetInvariantError};
