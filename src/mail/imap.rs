use anyhow::{Context, Result};
use native_tls::TlsConnector;
use std::net::TcpStream;
use tracing::debug;

use crate::config::Account;

type Session = imap::Session<native_tls::TlsStream<TcpStream>>;

fn is_localhost(host: &str) -> bool {
    host == "127.0.0.1" || host == "localhost"
}

fn tls_connector_for(account: &Account) -> Result<TlsConnector> {
    let mut b = TlsConnector::builder();

    // local bridges (Proton Mail Bridge and friends) use self-signed certs
    if is_localhost(&account.host) {
        b.danger_accept_invalid_certs(true);
        b.danger_accept_invalid_hostnames(true);
    }

    Ok(b.build()?)
}

fn connect(account: &Account) -> Result<Session> {
    let tls = tls_connector_for(account)?;
    let addr = (account.host.as_str(), account.port);

    let client = if account.starttls {
        imap::connect_starttls(addr, &account.host, &tls)
    } else {
        imap::connect(addr, &account.host, &tls)
    }
    .with_context(|| format!("connecting to {}:{}", account.host, account.port))?;

    let session = client
        .login(&account.username, &account.password)
        .map_err(|e| e.0)
        .with_context(|| format!("logging in as {}", account.username))?;

    Ok(session)
}

/// Count the messages in `folder` matching the IMAP search `criteria`.
///
/// Opens and closes its own session.
pub fn count_matching(account: &Account, folder: &str, criteria: &str) -> Result<u64> {
    let mut sess = connect(account)?;

    let mailbox = sess
        .select(folder)
        .with_context(|| format!("selecting folder {folder}"))?;
    debug!(folder, exists = mailbox.exists, "folder selected");

    let ids = sess
        .search(criteria)
        .with_context(|| format!("searching {folder} for {criteria}"))?;

    let _ = sess.logout();
    Ok(ids.len() as u64)
}
