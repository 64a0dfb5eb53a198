//! Integration tests for scanning, duplicate removal, and batch reporting.

use std::path::{Path, PathBuf};

use assert_fs::prelude::*;
use predicates::prelude::*;

use mboxdedup::dedup::{BatchRunner, DedupContext, Deduplicator, NoProgress};
use mboxdedup::fingerprint::FingerprintPolicy;
use mboxdedup::scanner::{self, Classification};
use mboxdedup::store::reader::MboxStore;

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn fixture_text(name: &str) -> String {
    std::fs::read_to_string(fixture(name)).unwrap()
}

fn policy(policy: FingerprintPolicy) -> DedupContext {
    DedupContext {
        policy,
        ..Default::default()
    }
}

fn message(n: usize, body: &str) -> String {
    format!(
        "From sender@example.com Thu Jan 01 00:00:00 2024\n\
         Message-ID: <{n}@example.com>\n\
         Subject: note {n}\n\
         \n\
         {body}\n\
         \n"
    )
}

// ─── Fixture: duplicates.mbox ───────────────────────────────────────

#[test]
fn test_fixture_has_four_messages() {
    let store = MboxStore::load(fixture("duplicates.mbox")).unwrap();
    assert_eq!(store.len(), 4);
    assert!(store.messages[0].separator.starts_with(b"From alice@example.com"));
}

#[test]
fn test_strict_removes_only_byte_identical_copy() {
    let tmp = assert_fs::TempDir::new().unwrap();
    let inbox = tmp.child("Inbox");
    inbox.write_str(&fixture_text("duplicates.mbox")).unwrap();

    let report = Deduplicator::new(&DedupContext::default())
        .process_one(inbox.path())
        .unwrap();
    assert_eq!(report.messages_before, 4);
    assert_eq!(report.deleted, 1);

    // The copy differs only in its separator line; dropping it leaves the
    // other three chunks byte for byte.
    let original = fixture_text("duplicates.mbox");
    let start = original.find("From alice@example.com Tue Mar 05").unwrap();
    let end = original.find("From alice@example.com Mon Mar 04 09:20").unwrap();
    let expected = format!("{}{}", &original[..start], &original[end..]);
    inbox.assert(predicate::str::diff(expected));
}

#[test]
fn test_simple_policy_matches_normalized_headers() {
    let tmp = assert_fs::TempDir::new().unwrap();
    let inbox = tmp.child("Inbox");
    inbox.write_str(&fixture_text("duplicates.mbox")).unwrap();

    let report = Deduplicator::new(&policy(FingerprintPolicy::Simple))
        .process_one(inbox.path())
        .unwrap();
    assert_eq!(report.deleted, 2);

    inbox.assert(predicate::str::contains("Lunch?"));
    inbox.assert(predicate::str::contains("sorry, the report").not());
    assert_eq!(MboxStore::load(inbox.path()).unwrap().len(), 2);
}

#[test]
fn test_header_body_policy_keeps_edited_body() {
    let tmp = assert_fs::TempDir::new().unwrap();
    let inbox = tmp.child("Inbox");
    inbox.write_str(&fixture_text("duplicates.mbox")).unwrap();

    let report = Deduplicator::new(&policy(FingerprintPolicy::HeaderBody))
        .process_one(inbox.path())
        .unwrap();
    assert_eq!(report.deleted, 1);
    inbox.assert(predicate::str::contains("sorry, the report"));
}

#[test]
fn test_hashed_header_agrees_with_simple() {
    let tmp = assert_fs::TempDir::new().unwrap();
    let a = tmp.child("a");
    let b = tmp.child("b");
    a.write_str(&fixture_text("duplicates.mbox")).unwrap();
    b.write_str(&fixture_text("duplicates.mbox")).unwrap();

    let simple = Deduplicator::new(&policy(FingerprintPolicy::Simple))
        .process_one(a.path())
        .unwrap();
    let hashed = Deduplicator::new(&policy(FingerprintPolicy::HashedHeader))
        .process_one(b.path())
        .unwrap();
    assert_eq!(simple.deleted, hashed.deleted);
    assert_eq!(
        std::fs::read(a.path()).unwrap(),
        std::fs::read(b.path()).unwrap()
    );
}

#[test]
fn test_unique_mailbox_is_not_rewritten() {
    let tmp = assert_fs::TempDir::new().unwrap();
    let inbox = tmp.child("Unique");
    inbox.write_str(&fixture_text("unique.mbox")).unwrap();
    let before = std::fs::metadata(inbox.path()).unwrap().modified().unwrap();

    let report = Deduplicator::new(&DedupContext::default())
        .process_one(inbox.path())
        .unwrap();

    assert_eq!(report.deleted, 0);
    assert!(report.message.is_empty());
    assert!(!report.changed());
    inbox.assert(predicate::str::diff(fixture_text("unique.mbox")));
    let after = std::fs::metadata(inbox.path()).unwrap().modified().unwrap();
    assert_eq!(before, after);
}

#[test]
fn test_second_pass_finds_nothing() {
    let tmp = assert_fs::TempDir::new().unwrap();
    let inbox = tmp.child("Inbox");
    inbox.write_str(&fixture_text("duplicates.mbox")).unwrap();

    let dedup = Deduplicator::new(&DedupContext::default());
    assert_eq!(dedup.process_one(inbox.path()).unwrap().deleted, 1);
    assert_eq!(dedup.process_one(inbox.path()).unwrap().deleted, 0);
}

// ─── Body lines starting with "From " ───────────────────────────────

fn signed_message(sender: &str, date: &str, name: &str) -> String {
    format!(
        "From {sender} {date}\n\
         Message-ID: <{name}@example.com>\n\
         Subject: Hi {name}\n\
         \n\
         Hi {name}\n\
         From {name}: thanks\n\
         Cheers\n\
         \n\
         >From the archive, as promised.\n\
         \n"
    )
}

#[test]
fn test_distinct_messages_with_from_body_lines_survive() {
    let tmp = assert_fs::TempDir::new().unwrap();
    let inbox = tmp.child("Inbox");
    let original = signed_message("alice@example.com", "Mon Mar 04 09:15:00 2024", "Alice")
        + &signed_message("bob@example.com", "Mon Mar 04 10:02:00 2024", "Bob");
    inbox.write_str(&original).unwrap();

    let store = MboxStore::load(inbox.path()).unwrap();
    assert_eq!(store.len(), 2);

    let report = Deduplicator::new(&DedupContext::default())
        .process_one(inbox.path())
        .unwrap();
    assert_eq!(report.deleted, 0);
    inbox.assert(predicate::str::diff(original));
}

#[test]
fn test_rewrite_keeps_from_body_lines_of_kept_messages() {
    let tmp = assert_fs::TempDir::new().unwrap();
    let inbox = tmp.child("Inbox");
    let alice = signed_message("alice@example.com", "Mon Mar 04 09:15:00 2024", "Alice");
    let bob = signed_message("bob@example.com", "Mon Mar 04 10:02:00 2024", "Bob");
    let alice_again = signed_message("alice@example.com", "Tue Mar 05 08:00:00 2024", "Alice");
    inbox
        .write_str(&format!("{alice}{bob}{alice_again}"))
        .unwrap();

    let report = Deduplicator::new(&DedupContext::default())
        .process_one(inbox.path())
        .unwrap();
    assert_eq!(report.deleted, 1);
    inbox.assert(predicate::str::diff(format!("{alice}{bob}")));
    inbox.assert(predicate::str::contains("From Bob: thanks\nCheers\n"));
}

// ─── Batch ──────────────────────────────────────────────────────────

#[test]
fn test_batch_aggregates_in_order() {
    let tmp = assert_fs::TempDir::new().unwrap();
    let first = tmp.child("First");
    let second = tmp.child("Second");
    let clean = tmp.child("Clean");

    // 2 copies of one message plus a unique one: 2 deleted
    first
        .write_str(&(message(1, "a").repeat(3) + &message(2, "b")))
        .unwrap();
    // 4 copies: 3 deleted
    second.write_str(&message(3, "c").repeat(4)).unwrap();
    clean.write_str(&fixture_text("unique.mbox")).unwrap();

    let paths = vec![
        first.path().to_path_buf(),
        clean.path().to_path_buf(),
        second.path().to_path_buf(),
    ];
    let batch = BatchRunner::new(&DedupContext::default())
        .process_all(&paths, &mut NoProgress)
        .unwrap();

    assert_eq!(batch.total_deleted, 5);
    assert_eq!(batch.updated_paths(), paths);
    assert_eq!(
        batch.combined_text(),
        format!(
            "Deleted 2 duplicate messages from mbox {}\n\
             Deleted 3 duplicate messages from mbox {}\n",
            first.path().display(),
            second.path().display()
        )
    );
    assert_eq!(
        batch.summary(),
        "Total duplicate messages deleted across all mailboxes: 5"
    );
    second.assert(predicate::str::diff(message(3, "c")));
}

#[test]
fn test_batch_without_duplicates() {
    let tmp = assert_fs::TempDir::new().unwrap();
    let clean = tmp.child("Clean");
    clean.write_str(&fixture_text("unique.mbox")).unwrap();

    let batch = BatchRunner::new(&DedupContext::default())
        .process_all(&[clean.path().to_path_buf()], &mut NoProgress)
        .unwrap();
    assert_eq!(batch.total_deleted, 0);
    assert_eq!(batch.combined_text(), "");
    assert_eq!(batch.summary(), "No duplicates were found");
}

// ─── Scanning ───────────────────────────────────────────────────────

#[test]
fn test_scan_thunderbird_layout() {
    let tmp = assert_fs::TempDir::new().unwrap();
    tmp.child("Inbox").write_str(&message(1, "x")).unwrap();
    tmp.child("Inbox.msf").write_str("// mork index\n").unwrap();
    tmp.child("Trash").write_str(&message(2, "y")).unwrap();
    tmp.child("Archives.sbd").create_dir_all().unwrap();
    tmp.child("Archives.sbd/2023")
        .write_str(&message(3, "z"))
        .unwrap();
    tmp.child("Archives.sbd/2023.msf")
        .write_str("// mork index\n")
        .unwrap();
    tmp.child("notes.txt").write_str("shopping list\n").unwrap();
    tmp.child(".hidden").write_str(&message(4, "w")).unwrap();

    let found = scanner::scan(tmp.path(), true).unwrap();
    assert_eq!(
        found,
        vec![
            tmp.path().join("Archives.sbd").join("2023"),
            tmp.path().join("Inbox"),
        ]
    );

    let with_trash = scanner::scan(tmp.path(), false).unwrap();
    assert_eq!(with_trash.len(), 3);
    assert!(with_trash.contains(&tmp.path().join("Trash")));
}

#[test]
fn test_scan_fixture_dir_gives_absolute_paths() {
    let found = scanner::scan(&fixture(""), true).unwrap();
    assert_eq!(found.len(), 2);
    assert!(found.iter().all(|p| p.is_absolute()));
}

#[test]
fn test_classify_non_mbox_files() {
    let tmp = assert_fs::TempDir::new().unwrap();
    let text = tmp.child("text");
    text.write_str("Subject: not a mailbox\n\nFromage is cheese.\n")
        .unwrap();
    let binary = tmp.child("binary");
    binary.write_binary(&[0xff, 0xfe, 0x00, 0x01, 0x80]).unwrap();
    let late = tmp.child("late");
    late.write_str(&("junk\n".repeat(10) + "From a@b Thu Jan 01 00:00:00 2024\n"))
        .unwrap();

    assert_eq!(scanner::classify(text.path()), Classification::NotMbox);
    assert_eq!(scanner::classify(binary.path()), Classification::NotMbox);
    assert_eq!(scanner::classify(late.path()), Classification::NotMbox);
    assert_eq!(
        scanner::classify(&fixture("duplicates.mbox")),
        Classification::Mbox
    );
    assert_eq!(
        scanner::classify(&tmp.path().join("missing")),
        Classification::Unreadable
    );
}

// ─── End to end ─────────────────────────────────────────────────────

#[test]
fn test_scan_then_dedup_folder() {
    let tmp = assert_fs::TempDir::new().unwrap();
    tmp.child("Inbox")
        .write_str(&fixture_text("duplicates.mbox"))
        .unwrap();
    tmp.child("Sent").write_str(&fixture_text("unique.mbox")).unwrap();
    tmp.child("Trash")
        .write_str(&fixture_text("duplicates.mbox"))
        .unwrap();

    let ctx = DedupContext::default();
    let mboxes = ctx.scanner().scan(tmp.path()).unwrap();
    assert_eq!(mboxes.len(), 2);

    let batch = BatchRunner::new(&ctx)
        .process_all(&mboxes, &mut NoProgress)
        .unwrap();
    assert_eq!(batch.total_deleted, 1);

    // Trash was excluded and keeps its duplicate
    tmp.child("Trash")
        .assert(predicate::str::diff(fixture_text("duplicates.mbox")));
    tmp.child("Sent")
        .assert(predicate::str::diff(fixture_text("unique.mbox")));
    // No stray temporary files next to the mailboxes
    let entries = std::fs::read_dir(tmp.path()).unwrap().count();
    assert_eq!(entries, 3);
}
