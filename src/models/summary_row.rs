/// Label/value pair on the review and result pages.
#[derive(Clone, Debug)]
pub struct SummaryRow {
    pub label: String,
    pub value: String,
}
