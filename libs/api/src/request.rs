use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Chat {
    #[serde(default)]
    pub username: Option<String>,
    pub message: String,
}
