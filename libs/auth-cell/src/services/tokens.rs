use rand::{distributions::Alphanumeric, Rng};

/// 32 random bytes, hex encoded. Used for verification and reset links.
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::thread_rng().gen();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Throwaway password for accounts created on someone's behalf.
pub fn generate_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}
