mod addons;
mod lifecycle;

pub use addons::MinioAddonScenario;
pub use lifecycle::StopStartScenario;
