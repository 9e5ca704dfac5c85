pub mod activity;
pub mod audit;
pub mod auth;
pub mod client;
pub mod dashboard;
pub mod report;

/// Distingue "campo ausente" (`None`) de "campo explicitamente nulo" (`Some(None)`)
/// em patches JSON.
pub mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}
