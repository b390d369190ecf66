use crate::{
    auth::backend::GateAuthBackend,
    data::user::User,
    error::{GateResult, IncorrectPermissionsSnafu},
};
use axum_login::AuthSession;
use bitflags::bitflags;

pub mod backend;
pub mod postgres_store;
pub mod verifier;

pub type GateSession = AuthSession<GateAuthBackend>;

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct PermissionsTarget: u8 {
        const REVIEW_REQUESTS =    0b0000_0001;
        const CONFIRM_EXIT =       0b0000_0010;
        const CONFIRM_RETURN =     0b0000_0100;
        const DISPATCH_EMERGENCY = 0b0000_1000;

        const VIEW_GATE =          0b0001_0000;
        const VIEW_ALL_REQUESTS =  0b0010_0000;
        const MANAGE_DEVICES =     0b0100_0000;
        const RUN_INSIGHTS =       0b1000_0000;
    }
}

pub trait AuthUtilities {
    fn permissions(&self) -> PermissionsTarget;

    fn can(&self, needed: PermissionsTarget) -> bool {
        self.permissions().contains(needed)
    }

    fn ensure_can(&self, needed: PermissionsTarget) -> GateResult<()> {
        let found = self.permissions();
        snafu::ensure!(
            found.contains(needed),
            IncorrectPermissionsSnafu { needed, found }
        );
        Ok(())
    }
}

impl AuthUtilities for GateSession {
    fn permissions(&self) -> PermissionsTarget {
        self.user
            .as_ref()
            .map_or_else(PermissionsTarget::empty, User::get_permissions)
    }
}
