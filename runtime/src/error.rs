use thiserror::Error;

use graft_intercept::HookError;

use crate::descriptor::Category;

/// Errors a load attempt can be denied with.
///
/// Only bring-up reports errors; teardown and rollback log their failures
/// and always run to completion.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("symbol not found: {0}")]
    SymbolNotFound(String),

    #[error("allocation failure")]
    AllocationFailure,

    #[error("hook install conflict at {target:#x}")]
    HookInstallConflict { target: usize },

    #[error("callback '{name}' failed during {stage}")]
    Callback {
        name: String,
        stage: Category,
        #[source]
        source: anyhow::Error,
    },

    #[error("permission denied")]
    PermissionDenied,
}

impl From<HookError> for LoadError {
    fn from(err: HookError) -> Self {
        match err {
            HookError::AlreadyInstalled(target) | HookError::NotInstalled(target) => {
                LoadError::HookInstallConflict { target }
            }
            HookError::AllocationFailed => LoadError::AllocationFailure,
            HookError::Unsupported => LoadError::PermissionDenied,
        }
    }
}

pub type Result<T> = std::result::Result<T, LoadError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hook_conflicts_map_onto_install_conflict() {
        assert!(matches!(
            LoadError::from(HookError::AlreadyInstalled(0x40)),
            LoadError::HookInstallConflict { target: 0x40 }
        ));
        assert!(matches!(
            LoadError::from(HookError::AllocationFailed),
            LoadError::AllocationFailure
        ));
    }

    #[test]
    fn callback_errors_name_their_stage() {
        let err = LoadError::Callback {
            name: "probe".into(),
            stage: Category::FinalInit,
            source: anyhow::anyhow!("device busy"),
        };
        assert_eq!(err.to_string(), "callback 'probe' failed during FINAL_INIT");
    }
}
