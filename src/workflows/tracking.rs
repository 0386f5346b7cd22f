//! Sign-in tracking workflow.
//!
//! A pure mutation: the previous `current_*` pair rolls into `last_*`,
//! then the new instant and origin become current and the counter bumps by
//! one. Tracking happens strictly after a successful authentication, never
//! as a gate.

use std::sync::Arc;
use tracing::debug;

use crate::account::AccountSecurity;
use crate::clock::Clock;

pub struct TrackingWorkflow {
    clock: Arc<dyn Clock>,
}

impl TrackingWorkflow {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Stamp a sign-in. Always succeeds; the caller persists the result.
    pub fn track(&self, account: &mut AccountSecurity, ip_address: Option<&str>) {
        let tracking = &mut account.tracking;
        tracking.sign_in_count = tracking.sign_in_count.saturating_add(1);
        tracking.last_sign_in_at = tracking.current_sign_in_at.take();
        tracking.last_sign_in_ip_address = tracking.current_sign_in_ip_address.take();
        tracking.current_sign_in_at = Some(self.clock.now());
        tracking.current_sign_in_ip_address = ip_address.map(ToString::to_string);
        debug!(
            account_id = %account.id,
            sign_in_count = tracking.sign_in_count,
            "tracked sign-in"
        );
    }
}
