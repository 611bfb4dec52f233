use crate::{config::Config, error, spotify};

pub async fn auth(config: &Config, account: Option<String>) {
    let account = match account {
        Some(index) => match config.account(&index) {
            Some(account) => account,
            None => error!("Account {} is not configured.", index),
        },
        None => match config.accounts.as_slice() {
            [only] => only,
            _ => error!("Several accounts are configured, pick one with --account."),
        },
    };

    if let Err(e) = spotify::auth::auth(&config.spotify, account).await {
        error!("{}", e);
    }
}
