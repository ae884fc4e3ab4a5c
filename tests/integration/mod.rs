pub mod framework;
pub mod scenarios;

pub use framework::{TestConfig, TestContext, TestScenario};
