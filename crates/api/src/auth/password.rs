use crate::error::AppError;

pub const MIN_PASSWORD_LEN: usize = 6;

/// bcrypt runs on the blocking pool so hashing never stalls the runtime.
pub struct PasswordService;

impl PasswordService {
    pub async fn hash(password: String, cost: u32) -> Result<String, AppError> {
        tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| AppError::Internal(format!("hash task failed: {e}")))?
            .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))
    }

    pub async fn verify(password: String, hash: String) -> Result<bool, AppError> {
        tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|e| AppError::Internal(format!("verify task failed: {e}")))?
            .map_err(|e| AppError::Internal(format!("password verification failed: {e}")))
    }

    pub fn validate(password: &str) -> Result<(), AppError> {
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::BadRequest(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_then_verify() {
        let hash = PasswordService::hash("hunter22".into(), 4).await.unwrap();
        assert!(PasswordService::verify("hunter22".into(), hash.clone()).await.unwrap());
        assert!(!PasswordService::verify("hunter23".into(), hash).await.unwrap());
    }

    #[test]
    fn short_passwords_are_rejected() {
        assert!(PasswordService::validate("12345").is_err());
        assert!(PasswordService::validate("123456").is_ok());
    }
}
