pub mod handlers;
pub mod planner;
pub mod prompts;
pub mod recovery;
pub mod request;
pub mod validation;
