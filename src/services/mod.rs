pub mod session_store;
pub mod wizard_service;

pub use session_store::{random_session_id, SessionStore, MAX_SESSIONS};
pub use wizard_service::{
    apply_step_form, field_views, is_last_step, spawn_submission, start_session, step_nav, summary_rows,
};
