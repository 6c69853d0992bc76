use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("store error: {0}")]
    Store(#[from] ltc_store::StoreError),

    #[error("LMDB error: {0}")]
    Lmdb(#[from] ltc_store_lmdb::LmdbError),

    #[error("integrity check failed: {0}")]
    Integrity(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("API server error: {0}")]
    Rpc(String),
}
