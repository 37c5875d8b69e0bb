/// A step in the progress bar.
#[derive(Clone, Debug)]
pub struct StepNavView {
    pub id: String,
    pub title: String,
    pub number: usize,
    pub is_current: bool,
    /// A link is rendered only for steps `goto` accepts.
    pub reachable: bool,
}
