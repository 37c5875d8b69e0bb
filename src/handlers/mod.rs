pub mod helpers;
pub mod system;
pub mod wizard;

pub use system::healthz;
pub use wizard::{
    back_post, cancel_post, dismiss_post, flow_start_post, flows_get, goto_post, next_post, root_get, session_get,
    values_post,
};
