//! External service integrations.

pub mod groq_client {
    pub use crate::groq_client::*;
}
