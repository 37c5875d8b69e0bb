pub mod app_state;
pub mod field_view;
pub mod flow_view;
pub mod step_nav_view;
pub mod summary_row;

pub use app_state::AppState;
pub use field_view::{FieldView, OptionView};
pub use flow_view::FlowView;
pub use step_nav_view::StepNavView;
pub use summary_row::SummaryRow;
