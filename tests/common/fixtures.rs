//! Test fixture creation for the platform database.

use anyhow::Result;
use viewvault_server::store::{RecordId, SqlitePlatformStore, UserAccountStore};
use viewvault_server::user::{NewUser, PasswordCredentials, User};

use super::constants::*;

/// Creates a user with the given credentials directly in the store.
pub fn create_user_with_password(
    store: &SqlitePlatformStore,
    username: &str,
    email: &str,
    password: &str,
) -> Result<User> {
    let user_id = RecordId::generate();
    let credentials = PasswordCredentials::from_plain(user_id.clone(), password)?;
    let user = store.create_user(NewUser {
        id: user_id,
        username: username.to_string(),
        email: email.to_string(),
        full_name: format!("Full {}", username),
        avatar_url: "/media/seedavatar00001.jpg".to_string(),
        cover_image_url: None,
        credentials,
    })?;
    Ok(user)
}

/// Seeds the two standard test users. Returns (test_user, creator_user).
pub fn seed_test_users(store: &SqlitePlatformStore) -> Result<(User, User)> {
    let test_user = create_user_with_password(store, TEST_USER, TEST_USER_EMAIL, TEST_PASS)?;
    let creator = create_user_with_password(store, CREATOR_USER, CREATOR_USER_EMAIL, CREATOR_PASS)?;
    Ok((test_user, creator))
}
