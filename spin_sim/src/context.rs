use serde::{Deserialize, Serialize};
use crate::error::Result;

/// Storage precision of the magnetization state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    Single,
    #[default]
    Double,
}

/// Execution settings handed to the ensemble and the scanner at construction.
/// `threads = None` runs on the global rayon pool.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, Default)]
pub struct ExecutionContext {
    #[serde(default)]
    pub precision:Precision,
    #[serde(default)]
    pub threads:Option<usize>,
}

impl ExecutionContext {
    pub fn new(precision:Precision,threads:Option<usize>) -> Self {
        Self {
            precision,
            threads
        }
    }

    pub fn serial() -> Self {
        Self::new(Precision::Double,Some(1))
    }

    /// runs `op` inside a pool sized by the thread hint
    pub fn install<R,F>(&self,op:F) -> Result<R>
        where F:FnOnce() -> R + Send, R:Send {
        match self.threads {
            None => Ok(op()),
            Some(n) => {
                let pool = rayon::ThreadPoolBuilder::new().num_threads(n.max(1)).build()?;
                Ok(pool.install(op))
            }
        }
    }
}
