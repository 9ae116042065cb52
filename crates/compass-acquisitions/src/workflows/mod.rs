pub mod acquisitions;
pub mod migration;

/// Whether a workflow may write to the CMS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    #[default]
    DryRun,
    Live,
}

impl RunMode {
    pub fn from_flag(live: bool) -> Self {
        if live {
            Self::Live
        } else {
            Self::DryRun
        }
    }

    pub fn is_live(self) -> bool {
        self == Self::Live
    }
}
