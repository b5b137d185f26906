#![allow(clippy::unwrap_used)]

use super::*;

async fn db() -> Database {
    Database::open_in_memory().await.unwrap()
}

fn cert<'a>(fingerprint: &'a str, email: &'a str, description: &'a str) -> NewCertificate<'a> {
    NewCertificate {
        fingerprint,
        email,
        description,
        created: 1_700_000_000,
        expires: 1_700_000_000 + 90 * 86_400,
    }
}

async fn enrolled(emails: &[&str]) -> Database {
    let db = db().await;
    for email in emails {
        db.upsert_identity_seed(email, "S").await.unwrap();
    }
    db
}

async fn event_names(db: &Database) -> Vec<String> {
    db.list_events(EventWindow::All)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.event)
        .collect()
}

#[tokio::test]
async fn upsert_creates_then_rotates() {
    let db = db().await;

    assert!(db.upsert_identity_seed("ann@example.com", "AAAA").await.unwrap());
    let first = db.get_identity("ann@example.com").await.unwrap().unwrap();

    assert!(!db.upsert_identity_seed("ann@example.com", "BBBB").await.unwrap());
    let second = db.get_identity("ann@example.com").await.unwrap().unwrap();

    assert_eq!(second.seed, "BBBB");
    assert_eq!(second.created, first.created);
    assert!(second.updated >= first.updated);
    assert_eq!(event_names(&db).await, vec!["TOTP set", "TOTP set"]);
}

#[tokio::test]
async fn get_identity_missing_is_none() {
    let db = db().await;
    assert!(db.get_identity("nobody@example.com").await.unwrap().is_none());
    assert!(!db.identity_exists("nobody@example.com").await.unwrap());
}

#[tokio::test]
async fn summaries_count_active_and_revoked() {
    let db = db().await;
    db.upsert_identity_seed("ann@example.com", "S").await.unwrap();
    db.upsert_identity_seed("bob@example.com", "S").await.unwrap();
    db.insert_certificate(&cert("aa", "ann@example.com", "laptop")).await.unwrap();
    db.insert_certificate(&cert("bb", "ann@example.com", "phone")).await.unwrap();
    db.revoke_certificate("bb").await.unwrap();

    let summaries = db.list_identity_summaries().await.unwrap();
    assert_eq!(
        summaries,
        vec![
            IdentitySummary {
                email: "ann@example.com".into(),
                active_certs: 1,
                revoked_certs: 1,
            },
            IdentitySummary {
                email: "bob@example.com".into(),
                active_certs: 0,
                revoked_certs: 0,
            },
        ]
    );
}

#[tokio::test]
async fn duplicate_fingerprint_is_conflict_and_leaves_no_event() {
    let db = enrolled(&["ann@example.com"]).await;
    db.insert_certificate(&cert("aa", "ann@example.com", "laptop")).await.unwrap();
    let before = db.count_events().await.unwrap();

    let err = db
        .insert_certificate(&cert("aa", "ann@example.com", "again"))
        .await
        .unwrap_err();
    assert!(matches!(err, DatabaseError::Conflict(_)));
    assert_eq!(db.count_events().await.unwrap(), before);
}

#[tokio::test]
async fn insert_without_identity_is_not_found_and_leaves_no_event() {
    let db = db().await;

    let err = db
        .insert_certificate(&cert("aa", "ghost@example.com", "laptop"))
        .await
        .unwrap_err();
    assert!(matches!(err, DatabaseError::NotFound(_)));
    assert!(db.get_certificate("aa").await.unwrap().is_none());
    assert_eq!(db.count_events().await.unwrap(), 0);
}

#[tokio::test]
async fn insert_after_identity_removed_is_not_found() {
    let db = enrolled(&["ann@example.com"]).await;
    db.remove_identity("ann@example.com").await.unwrap();

    let err = db
        .insert_certificate(&cert("aa", "ann@example.com", "laptop"))
        .await
        .unwrap_err();
    assert!(matches!(err, DatabaseError::NotFound(_)));
    assert_eq!(db.count_active_certificates("ann@example.com").await.unwrap(), 0);
}

#[tokio::test]
async fn issued_event_carries_fingerprint_and_description() {
    let db = enrolled(&["ann@example.com"]).await;
    db.insert_certificate(&cert("aa", "ann@example.com", "laptop")).await.unwrap();

    let events = db.list_events(EventWindow::Latest { limit: 1 }).await.unwrap();
    assert_eq!(events[0].event, "certificate issued");
    assert_eq!(events[0].email, "ann@example.com");
    assert_eq!(events[0].value, "aa - laptop");
}

#[tokio::test]
async fn revoke_is_one_way_and_audited_once() {
    let db = enrolled(&["ann@example.com"]).await;
    db.insert_certificate(&cert("aa", "ann@example.com", "laptop")).await.unwrap();

    let Revocation::Revoked(first) = db.revoke_certificate("aa").await.unwrap() else {
        panic!("expected a fresh revocation");
    };
    let Revocation::AlreadyRevoked(second) = db.revoke_certificate("aa").await.unwrap() else {
        panic!("expected an already-revoked certificate");
    };
    assert_eq!(first.revoked, second.revoked);
    assert_eq!(db.revoke_certificate("zz").await.unwrap(), Revocation::Unknown);

    let revocations = event_names(&db)
        .await
        .into_iter()
        .filter(|e| e == "certificate revoked")
        .count();
    assert_eq!(revocations, 1);
}

#[tokio::test]
async fn remove_identity_reports_every_owned_certificate() {
    let db = db().await;
    db.upsert_identity_seed("ann@example.com", "S").await.unwrap();
    db.insert_certificate(&cert("cc", "ann@example.com", "a")).await.unwrap();
    db.insert_certificate(&cert("aa", "ann@example.com", "b")).await.unwrap();
    db.insert_certificate(&cert("bb", "ann@example.com", "c")).await.unwrap();
    let Revocation::Revoked(earlier) = db.revoke_certificate("bb").await.unwrap() else {
        panic!("expected a fresh revocation");
    };

    let revoked = db.remove_identity("ann@example.com").await.unwrap();
    assert_eq!(revoked, vec!["aa", "bb", "cc"]);
    assert!(!db.identity_exists("ann@example.com").await.unwrap());
    assert_eq!(db.count_active_certificates("ann@example.com").await.unwrap(), 0);

    let bb = db.get_certificate("bb").await.unwrap().unwrap();
    assert_eq!(bb.revoked, earlier.revoked);

    let latest = db.list_events(EventWindow::Latest { limit: 1 }).await.unwrap();
    assert_eq!(latest[0].event, "user deleted");
    assert_eq!(latest[0].value, "3 certs revoked");
}

#[tokio::test]
async fn certificates_for_email_include_orphans() {
    let db = db().await;
    db.upsert_identity_seed("ann@example.com", "S").await.unwrap();
    db.insert_certificate(&cert("aa", "ann@example.com", "zeta")).await.unwrap();
    db.insert_certificate(&cert("bb", "ann@example.com", "alpha")).await.unwrap();
    db.remove_identity("ann@example.com").await.unwrap();

    let certs = db.list_certificates_for_email("ann@example.com").await.unwrap();
    let descriptions: Vec<_> = certs.iter().map(|c| c.description.as_str()).collect();
    assert_eq!(descriptions, vec!["alpha", "zeta"]);
    assert!(certs.iter().all(CertificateRecord::is_revoked));

    assert!(db.list_fleet_certificates().await.unwrap().is_empty());
}

#[tokio::test]
async fn fleet_listing_joins_identity_created() {
    let db = db().await;
    db.upsert_identity_seed("bob@example.com", "S").await.unwrap();
    db.upsert_identity_seed("ann@example.com", "S").await.unwrap();
    db.upsert_identity_seed("orphan@example.com", "S").await.unwrap();
    db.insert_certificate(&cert("b1", "bob@example.com", "x")).await.unwrap();
    db.insert_certificate(&cert("a1", "ann@example.com", "x")).await.unwrap();
    db.insert_certificate(&cert("o1", "orphan@example.com", "x")).await.unwrap();
    db.remove_identity("orphan@example.com").await.unwrap();

    let ann = db.get_identity("ann@example.com").await.unwrap().unwrap();
    let rows = db.list_fleet_certificates().await.unwrap();
    let owners: Vec<_> = rows.iter().map(|r| r.certificate.email.as_str()).collect();
    assert_eq!(owners, vec!["ann@example.com", "bob@example.com"]);
    assert_eq!(rows[0].identity_created, ann.created);
}

#[tokio::test]
async fn events_page_newest_first_with_cursor() {
    let db = db().await;
    for (i, ts) in [100, 200, 300].into_iter().enumerate() {
        let mut conn = db.pool().acquire().await.unwrap();
        super::queries_events::insert_event(
            &mut conn,
            EventKind::TotpSet,
            &format!("u{i}@example.com"),
            "",
            ts,
        )
        .await
        .unwrap();
    }

    let latest = db.list_events(EventWindow::Latest { limit: 2 }).await.unwrap();
    let stamps: Vec<_> = latest.iter().map(|e| e.ts).collect();
    assert_eq!(stamps, vec![300, 200]);

    let older = db
        .list_events(EventWindow::Before { before: 200, limit: 25 })
        .await
        .unwrap();
    let stamps: Vec<_> = older.iter().map(|e| e.ts).collect();
    assert_eq!(stamps, vec![100]);
}

#[tokio::test]
async fn events_before_cursor_pages_at_most_25() {
    let db = db().await;
    for i in 0..40 {
        let mut conn = db.pool().acquire().await.unwrap();
        super::queries_events::insert_event(
            &mut conn,
            EventKind::TotpSet,
            &format!("u{i}@example.com"),
            "",
            1_000 + i,
        )
        .await
        .unwrap();
    }

    let first = db
        .list_events(EventWindow::Before { before: 1_035, limit: 25 })
        .await
        .unwrap();
    let stamps: Vec<_> = first.iter().map(|e| e.ts).collect();
    assert_eq!(stamps, (1_010..1_035).rev().collect::<Vec<_>>());

    let cursor = first.last().unwrap().ts;
    let rest = db
        .list_events(EventWindow::Before { before: cursor, limit: 25 })
        .await
        .unwrap();
    let stamps: Vec<_> = rest.iter().map(|e| e.ts).collect();
    assert_eq!(stamps, (1_000..1_010).rev().collect::<Vec<_>>());
}

#[tokio::test]
async fn clear_events_leaves_reset_marker() {
    let db = db().await;
    db.append_event(EventKind::TotpSet, "ann@example.com", "").await.unwrap();
    db.append_event(EventKind::TotpSet, "bob@example.com", "").await.unwrap();

    let (listing, cleared) = db.clear_events(EventWindow::All).await.unwrap();
    assert_eq!(listing.len(), 2);
    assert_eq!(cleared, 2);

    let remaining = db.list_events(EventWindow::All).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].event, "events log reset");
    assert_eq!(remaining[0].value, "2 events cleared");
}

#[tokio::test]
async fn whitelist_add_is_idempotent_and_remove_reports() {
    let db = db().await;
    db.add_whitelisted("bob@example.com").await.unwrap();
    db.add_whitelisted("ann@example.com").await.unwrap();
    db.add_whitelisted("ann@example.com").await.unwrap();

    let emails: Vec<_> = db
        .list_whitelist()
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.email)
        .collect();
    assert_eq!(emails, vec!["ann@example.com", "bob@example.com"]);

    assert!(db.remove_whitelisted("ann@example.com").await.unwrap());
    assert!(!db.remove_whitelisted("ann@example.com").await.unwrap());
}

#[tokio::test]
async fn settings_overwrite_in_place() {
    let db = db().await;
    db.put_settings(&[("ServiceName", "One".into()), ("ClientLimit", "3".into())])
        .await
        .unwrap();
    db.put_settings(&[("ServiceName", "Two".into())]).await.unwrap();

    let rows = db.list_settings().await.unwrap();
    let pairs: Vec<_> = rows.iter().map(|r| (r.key.as_str(), r.value.as_str())).collect();
    assert_eq!(pairs, vec![("ClientLimit", "3"), ("ServiceName", "Two")]);
}
