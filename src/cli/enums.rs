//! CLI enum types.

use clap::ValueEnum;

use emotion_journal::camera::Facing;

/// Camera facing preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum FacingArg {
    #[default]
    User,
    Environment,
}

impl From<FacingArg> for Facing {
    fn from(f: FacingArg) -> Self {
        match f {
            FacingArg::User => Facing::User,
            FacingArg::Environment => Facing::Environment,
        }
    }
}
