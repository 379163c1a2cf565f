mod common;

use std::sync::Arc;

use chrono::Utc;
use common::*;
use gtrack_functions::db::Database;
use gtrack_functions::models::*;
use gtrack_functions::recovery::{RecoveryConfig, RecoveryError, RecoveryService};

fn setup() -> (Database, Arc<RecordingSms>, RecoveryService) {
    let db = open_db();
    let sms = Arc::new(RecordingSms::default());
    let service = RecoveryService::new(db.clone(), sms.clone(), RecoveryConfig::default());
    (db, sms, service)
}

mod verify_user {
    use super::*;

    #[test]
    fn accepts_a_user_with_a_phone_on_file() {
        let (db, _sms, service) = setup();
        db.create_user(UserType::Resident, resident_input("maria01"))
            .unwrap();

        assert!(service
            .verify_user_for_reset("maria01", UserType::Resident)
            .is_ok());
    }

    #[test]
    fn rejects_unknown_usernames() {
        let (_db, _sms, service) = setup();
        let err = service
            .verify_user_for_reset("ghost", UserType::Resident)
            .unwrap_err();
        assert!(matches!(err, RecoveryError::NotFound));
    }

    #[test]
    fn rejects_users_without_a_phone() {
        let (db, _sms, service) = setup();
        db.create_user(
            UserType::Resident,
            CreateUserInput {
                phone: None,
                ..resident_input("maria01")
            },
        )
        .unwrap();

        let err = service
            .verify_user_for_reset("maria01", UserType::Resident)
            .unwrap_err();
        assert!(matches!(err, RecoveryError::MissingContact));
    }

    #[test]
    fn rejects_empty_username_before_any_lookup() {
        let (_db, _sms, service) = setup();
        let err = service
            .verify_user_for_reset("", UserType::Resident)
            .unwrap_err();
        assert!(matches!(err, RecoveryError::InvalidArgument(_)));
    }

    #[test]
    fn collectors_use_their_own_partition() {
        let (db, _sms, service) = setup();
        db.create_user(UserType::Collector, resident_input("drv01"))
            .unwrap();

        assert!(service
            .verify_user_for_reset("drv01", UserType::Collector)
            .is_ok());
        let err = service
            .verify_user_for_reset("drv01", UserType::Resident)
            .unwrap_err();
        assert!(matches!(err, RecoveryError::NotFound));
    }
}

mod send_otp {
    use super::*;

    #[tokio::test]
    async fn stores_the_code_and_sends_it_over_sms() {
        let (db, sms, service) = setup();
        db.create_user(UserType::Resident, resident_input("maria01"))
            .unwrap();

        service.send_otp("maria01", UserType::Resident).await.unwrap();

        let user = db
            .find_user_by_username(UserType::Resident, "maria01")
            .unwrap()
            .unwrap();
        let stored = user.reset_code.expect("code should be stored");
        assert_eq!(stored.len(), 6);
        assert!(user.reset_timestamp_ms.is_some());

        let body = sms.last_body().expect("an SMS should have been sent");
        assert_eq!(extract_code(&body), stored);
    }

    #[tokio::test]
    async fn a_fresh_code_replaces_the_outstanding_one() {
        let (db, sms, service) = setup();
        let user = db
            .create_user(UserType::Resident, resident_input("maria01"))
            .unwrap();
        db.set_reset_state(UserType::Resident, user.id, "000000", 0)
            .unwrap();

        service.send_otp("maria01", UserType::Resident).await.unwrap();

        let user = db
            .find_user_by_username(UserType::Resident, "maria01")
            .unwrap()
            .unwrap();
        let body = sms.last_body().unwrap();
        assert_eq!(user.reset_code.as_deref(), Some(extract_code(&body).as_str()));
        assert_ne!(user.reset_code.as_deref(), Some("000000"));
    }

    #[tokio::test]
    async fn surfaces_sms_transport_failure() {
        let (db, sms, service) = setup();
        db.create_user(UserType::Resident, resident_input("maria01"))
            .unwrap();
        sms.fail_sends();

        let err = service
            .send_otp("maria01", UserType::Resident)
            .await
            .unwrap_err();
        assert!(matches!(err, RecoveryError::Delivery(_)));
    }

    #[tokio::test]
    async fn fails_for_users_without_a_phone() {
        let (db, _sms, service) = setup();
        db.create_user(
            UserType::Resident,
            CreateUserInput {
                phone: None,
                ..resident_input("maria01")
            },
        )
        .unwrap();

        let err = service
            .send_otp("maria01", UserType::Resident)
            .await
            .unwrap_err();
        assert!(matches!(err, RecoveryError::MissingContact));
    }
}

mod verify_otp {
    use super::*;

    #[tokio::test]
    async fn full_flow_resets_the_password_and_clears_the_code() {
        let (db, sms, service) = setup();
        db.create_user(UserType::Resident, resident_input("maria01"))
            .unwrap();

        service.send_otp("maria01", UserType::Resident).await.unwrap();
        let code = extract_code(&sms.last_body().unwrap());

        service
            .verify_otp_and_update_password("maria01", UserType::Resident, &code, "new-secret")
            .unwrap();

        let user = db
            .find_user_by_username(UserType::Resident, "maria01")
            .unwrap()
            .unwrap();
        assert_eq!(user.password, "new-secret");
        assert!(user.reset_code.is_none());
        assert!(user.reset_timestamp_ms.is_none());

        // Replaying the spent code fails as InvalidCode.
        let err = service
            .verify_otp_and_update_password("maria01", UserType::Resident, &code, "another")
            .unwrap_err();
        assert!(matches!(err, RecoveryError::InvalidCode));
    }

    #[test]
    fn correct_code_at_299_seconds_succeeds() {
        let (db, _sms, service) = setup();
        let user = db
            .create_user(UserType::Resident, resident_input("maria01"))
            .unwrap();
        db.set_reset_state(
            UserType::Resident,
            user.id,
            "123456",
            Utc::now().timestamp_millis() - 299_000,
        )
        .unwrap();

        assert!(service
            .verify_otp_and_update_password("maria01", UserType::Resident, "123456", "fresh")
            .is_ok());
    }

    #[test]
    fn correct_code_at_301_seconds_is_expired() {
        let (db, _sms, service) = setup();
        let user = db
            .create_user(UserType::Resident, resident_input("maria01"))
            .unwrap();
        db.set_reset_state(
            UserType::Resident,
            user.id,
            "123456",
            Utc::now().timestamp_millis() - 301_000,
        )
        .unwrap();

        let err = service
            .verify_otp_and_update_password("maria01", UserType::Resident, "123456", "fresh")
            .unwrap_err();
        assert!(matches!(err, RecoveryError::Expired));

        // The outstanding pair survives a failed attempt.
        let user = db
            .find_user_by_username(UserType::Resident, "maria01")
            .unwrap()
            .unwrap();
        assert!(user.reset_code.is_some());
    }

    #[test]
    fn wrong_code_is_invalid_regardless_of_age() {
        let (db, _sms, service) = setup();
        let user = db
            .create_user(UserType::Resident, resident_input("maria01"))
            .unwrap();
        db.set_reset_state(
            UserType::Resident,
            user.id,
            "123456",
            Utc::now().timestamp_millis() - 301_000,
        )
        .unwrap();

        // Expired AND wrong: the mismatch wins, never Expired.
        let err = service
            .verify_otp_and_update_password("maria01", UserType::Resident, "654321", "fresh")
            .unwrap_err();
        assert!(matches!(err, RecoveryError::InvalidCode));
    }

    #[test]
    fn no_outstanding_code_is_invalid() {
        let (db, _sms, service) = setup();
        db.create_user(UserType::Resident, resident_input("maria01"))
            .unwrap();

        let err = service
            .verify_otp_and_update_password("maria01", UserType::Resident, "123456", "fresh")
            .unwrap_err();
        assert!(matches!(err, RecoveryError::InvalidCode));
    }

    #[test]
    fn empty_inputs_fail_fast() {
        let (_db, _sms, service) = setup();
        let err = service
            .verify_otp_and_update_password("maria01", UserType::Resident, "", "fresh")
            .unwrap_err();
        assert!(matches!(err, RecoveryError::InvalidArgument(_)));

        let err = service
            .verify_otp_and_update_password("maria01", UserType::Resident, "123456", "")
            .unwrap_err();
        assert!(matches!(err, RecoveryError::InvalidArgument(_)));
    }
}

mod login {
    use super::*;

    #[test]
    fn returns_the_profile_on_success() {
        let (db, _sms, service) = setup();
        db.create_user(UserType::Resident, resident_input("maria01"))
            .unwrap();

        let profile = service.verify_resident_login("maria01", "hunter2").unwrap();
        assert_eq!(profile.username, "maria01");
        assert_eq!(profile.first_name.as_deref(), Some("Maria"));
        assert_eq!(profile.city.as_deref(), Some("Manila"));
    }

    #[test]
    fn wrong_password_is_unauthenticated() {
        let (db, _sms, service) = setup();
        db.create_user(UserType::Resident, resident_input("maria01"))
            .unwrap();

        let err = service
            .verify_resident_login("maria01", "wrong")
            .unwrap_err();
        assert!(matches!(err, RecoveryError::Unauthenticated));
    }

    #[test]
    fn unknown_username_is_not_found() {
        let (_db, _sms, service) = setup();
        let err = service.verify_resident_login("ghost", "pw").unwrap_err();
        assert!(matches!(err, RecoveryError::NotFound));
    }

    #[test]
    fn password_works_after_a_completed_reset() {
        let (db, _sms, service) = setup();
        let user = db
            .create_user(UserType::Resident, resident_input("maria01"))
            .unwrap();
        db.set_reset_state(
            UserType::Resident,
            user.id,
            "123456",
            Utc::now().timestamp_millis(),
        )
        .unwrap();
        service
            .verify_otp_and_update_password("maria01", UserType::Resident, "123456", "rotated")
            .unwrap();

        assert!(service.verify_resident_login("maria01", "rotated").is_ok());
        let err = service
            .verify_resident_login("maria01", "hunter2")
            .unwrap_err();
        assert!(matches!(err, RecoveryError::Unauthenticated));
    }
}
