use crate::messages::HealthRes;

/// Liveness check shared by every API surface.
///
/// The payload does not depend on whether a model artifact is loaded.
#[derive(Clone, Default)]
pub struct HealthService;

impl HealthService {
    /// Returns the fixed liveness payload.
    pub fn check_health() -> HealthRes {
        HealthRes {
            ok: true,
            message: "No-show prediction API is alive".into(),
        }
    }
}
