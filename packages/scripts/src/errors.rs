use crate::ScriptLocation;
use clonup_dom::DomError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("Document has no {0:?} element to hold scripts")]
    MissingContainer(ScriptLocation),

    #[error(transparent)]
    Dom(#[from] DomError),
}
