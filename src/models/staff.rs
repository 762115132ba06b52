use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::StaffRole;

/// PBKDF2 iteration count for staff password hashes.
const PBKDF2_ROUNDS: u32 = 100_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Staff {
    pub id: Uuid,
    /// Badge number used as the login identifier.
    pub badge: String,
    pub name: String,
    pub role: StaffRole,
    #[serde(skip_serializing)]
    pub password_salt: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub active: bool,
    pub created_at: NaiveDateTime,
}

impl Staff {
    pub fn verify_password(&self, password: &str) -> bool {
        hash_password(&self.password_salt, password) == self.password_hash
    }
}

/// Derive a hex-encoded PBKDF2-HMAC-SHA256 hash for a staff password.
pub fn hash_password(salt: &str, password: &str) -> String {
    use sha2::Sha256;
    let mut derived = [0u8; 32];
    pbkdf2::pbkdf2_hmac::<Sha256>(
        password.as_bytes(),
        salt.as_bytes(),
        PBKDF2_ROUNDS,
        &mut derived,
    );
    derived.iter().map(|b| format!("{b:02x}")).collect()
}

/// Generate a random hex salt for a new staff account.
pub fn generate_salt() -> String {
    let bytes: [u8; 16] = rand::random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_verifies_with_same_salt() {
        let salt = generate_salt();
        let hash = hash_password(&salt, "ward-7-secret");
        let staff = Staff {
            id: Uuid::new_v4(),
            badge: "N1234".into(),
            name: "A. Nurse".into(),
            role: StaffRole::Reporter,
            password_salt: salt,
            password_hash: hash,
            active: true,
            created_at: NaiveDateTime::default(),
        };
        assert!(staff.verify_password("ward-7-secret"));
        assert!(!staff.verify_password("wrong"));
    }

    #[test]
    fn different_salts_give_different_hashes() {
        let a = hash_password(&generate_salt(), "same-password");
        let b = hash_password(&generate_salt(), "same-password");
        assert_ne!(a, b);
    }
}
