use serde::{Deserialize, Serialize};

/// The support case the agent is asked to resolve.
///
/// Immutable for the lifetime of a run; everything the model learns about
/// the user's problem comes from here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseContext {
    /// Unique identifier for this case.
    pub case_id: String,
    /// Name the agent speaks as when messaging support.
    pub customer_name: String,
    /// The customer's description of the problem.
    pub issue: String,
    /// What a successful resolution looks like.
    pub desired_outcome: String,
    /// Order reference, when the case concerns a specific order.
    pub order_id: Option<String>,
    /// Whether the user attached evidence (receipts, screenshots).
    pub has_attachments: bool,
    /// Package name of the app the case must be resolved in.
    pub target_package: String,
    /// Human-readable name of the target platform (e.g. "Amazon").
    pub target_platform: String,
}
