use rand::Rng;
use uuid::Uuid;

pub fn generate_otp() -> String {
    let mut rng = rand::thread_rng();
    format!("{:06}", rng.gen_range(0..1_000_000))
}

/// Redis key holding the archived-message unlock flag for one user in
/// one chat room.
pub fn unlock_key(user_id: Uuid, chat_room_id: Uuid) -> String {
    format!("tunnel:unlocked:{user_id}:{chat_room_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn otp_is_six_digits() {
        for _ in 0..50 {
            let code = generate_otp();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn unlock_key_is_scoped_per_user_and_room() {
        let user = Uuid::new_v4();
        let room_a = Uuid::new_v4();
        let room_b = Uuid::new_v4();
        assert_ne!(unlock_key(user, room_a), unlock_key(user, room_b));
        assert!(unlock_key(user, room_a).starts_with("tunnel:unlocked:"));
    }
}
