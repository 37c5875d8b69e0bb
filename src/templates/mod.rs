pub mod error_template;
pub mod flows_template;
pub mod result_template;
pub mod step_template;

pub use error_template::ErrorTemplate;
pub use flows_template::FlowsTemplate;
pub use result_template::ResultTemplate;
pub use step_template::StepTemplate;
