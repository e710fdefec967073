// Domain-layer modules and shared errors/models
pub mod analysis {
    pub use crate::lead_analysis::*;
}

pub mod analytics {
    pub use crate::analytics::*;
}

pub mod models {
    pub use crate::models::*;
}

pub mod services {
    pub use crate::services::*;
}

pub mod errors {
    pub use crate::errors::*;
}
