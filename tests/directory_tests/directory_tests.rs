//! Tests for Directory
//!
//! These tests verify:
//! - Registration uniqueness, ordering and ages
//! - Session binding and offline queue draining
//! - Follow graph mirroring under blocks
//! - History-derived post counts

use std::sync::Arc;
use std::thread;

use bgs::directory::{Delivery, Directory};
use bgs::protocol::Notification;
use chrono::NaiveDate;

// =============================================================================
// Helper Functions
// =============================================================================

fn directory() -> Directory {
    Directory::with_today(NaiveDate::from_ymd_opt(2024, 6, 15).unwrap())
}

fn names(users: &[Arc<bgs::directory::User>]) -> Vec<&str> {
    users.iter().map(|u| u.username()).collect()
}

// =============================================================================
// Registration
// =============================================================================

#[test]
fn test_register_and_lookup() {
    let dir = directory();
    let alice = dir.register("alice", "pw", 1990, 1, 1).unwrap();

    assert_eq!(alice.username(), "alice");
    assert_eq!(alice.age(), 34);
    assert!(alice.password_matches("pw"));
    assert!(!alice.password_matches("PW"));
    assert!(dir.get_by_name("alice").is_some());
    assert!(dir.get_by_name("Alice").is_none());
}

#[test]
fn test_register_duplicate_fails() {
    let dir = directory();
    dir.register("alice", "pw", 1990, 1, 1).unwrap();

    assert!(dir.register("alice", "other", 2000, 1, 1).is_err());
    assert_eq!(dir.registered_count(), 1);
    assert!(dir.get_by_name("alice").unwrap().password_matches("pw"));
}

#[test]
fn test_sequence_numbers_increase() {
    let dir = directory();
    let a = dir.register("a", "pw", 2000, 1, 1).unwrap();
    let b = dir.register("b", "pw", 2000, 1, 1).unwrap();
    let c = dir.register("c", "pw", 2000, 1, 1).unwrap();

    assert!(a.seq() < b.seq());
    assert!(b.seq() < c.seq());
}

#[test]
fn test_concurrent_registration_of_same_name() {
    let dir = Arc::new(directory());
    let mut handles = vec![];

    for _ in 0..8 {
        let dir = Arc::clone(&dir);
        handles.push(thread::spawn(move || dir.register("dup", "pw", 2000, 1, 1).is_ok()));
    }

    let winners = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|ok| *ok)
        .count();
    assert_eq!(winners, 1);
    assert_eq!(dir.registered_count(), 1);
}

#[test]
fn test_list_registered_order_and_block_filter() {
    let dir = directory();
    let zed = dir.register("zed", "pw", 2000, 1, 1).unwrap();
    let amy = dir.register("amy", "pw", 2000, 1, 1).unwrap();
    let max = dir.register("max", "pw", 2000, 1, 1).unwrap();

    assert_eq!(names(&dir.list_registered(&amy)), vec!["zed", "amy", "max"]);

    // max blocks amy: amy no longer sees max, everyone else unchanged
    dir.block(&max, &amy);
    assert_eq!(names(&dir.list_registered(&amy)), vec!["zed", "amy"]);
    assert_eq!(names(&dir.list_registered(&zed)), vec!["zed", "amy", "max"]);
    assert_eq!(names(&dir.list_registered(&max)), vec!["zed", "amy", "max"]);
}

// =============================================================================
// Sessions
// =============================================================================

#[test]
fn test_login_logout_binding() {
    let dir = directory();
    let alice = dir.register("alice", "pw", 2000, 1, 1).unwrap();
    assert!(!dir.is_anyone_logged_in());

    dir.login(&alice, 5, |_| {});
    assert!(dir.is_anyone_logged_in());
    assert_eq!(dir.get_by_connection(5).unwrap().username(), "alice");
    assert_eq!(alice.connection_id(), Some(5));

    let out = dir.logout(5).unwrap();
    assert_eq!(out.username(), "alice");
    assert!(!alice.is_connected());
    assert!(dir.get_by_connection(5).is_none());
    assert!(dir.logout(5).is_none());
}

#[test]
fn test_queue_only_fills_while_offline() {
    let dir = directory();
    let bob = dir.register("bob", "pw", 2000, 1, 1).unwrap();

    assert_eq!(bob.deliver(Notification::public("a", "1"), |_, _| true), Delivery::Queued);
    assert_eq!(bob.deliver(Notification::public("a", "2"), |_, _| true), Delivery::Queued);

    let mut drained = Vec::new();
    dir.login(&bob, 1, |n| drained.push(n.content));
    assert_eq!(drained, vec!["1", "2"]);

    assert_eq!(bob.deliver(Notification::public("a", "3"), |_, _| true), Delivery::Live);
    assert_eq!(bob.pending_count(), 0);

    dir.logout(1);
    assert_eq!(bob.deliver(Notification::private("a", "4"), |_, _| true), Delivery::Queued);
    assert_eq!(bob.pending_count(), 1);
}

#[test]
fn test_delivery_racing_login_is_never_lost() {
    let dir = Arc::new(directory());
    let bob = dir.register("bob", "pw", 2000, 1, 1).unwrap();

    let sender = {
        let bob = Arc::clone(&bob);
        thread::spawn(move || {
            let mut live = 0;
            for i in 0..500 {
                if bob.deliver(Notification::public("a", i.to_string()), |_, _| true) == Delivery::Live {
                    live += 1;
                }
            }
            live
        })
    };

    let mut drained = 0;
    dir.login(&bob, 1, |_| drained += 1);

    let live = sender.join().unwrap();
    assert_eq!(drained + live + bob.pending_count(), 500);
}

// =============================================================================
// Social Graph
// =============================================================================

#[test]
fn test_follow_unfollow_mirrors() {
    let dir = directory();
    let a = dir.register("a", "pw", 2000, 1, 1).unwrap();
    let b = dir.register("b", "pw", 2000, 1, 1).unwrap();

    assert!(dir.follow_or_unfollow(&a, "b", true));
    assert!(!dir.follow_or_unfollow(&a, "b", true));
    assert!(a.is_following("b") && b.has_follower("a"));

    assert!(dir.follow_or_unfollow(&a, "b", false));
    assert!(!dir.follow_or_unfollow(&a, "b", false));
    assert!(!a.is_following("b") && !b.has_follower("a"));
}

#[test]
fn test_follow_unknown_or_self() {
    let dir = directory();
    let a = dir.register("a", "pw", 2000, 1, 1).unwrap();

    assert!(!dir.follow_or_unfollow(&a, "nobody", true));
    assert!(!dir.follow_or_unfollow(&a, "a", true));
    assert_eq!(a.following_count(), 0);
}

#[test]
fn test_block_severs_edges_and_prevents_follow() {
    let dir = directory();
    let a = dir.register("a", "pw", 2000, 1, 1).unwrap();
    let b = dir.register("b", "pw", 2000, 1, 1).unwrap();
    dir.follow_or_unfollow(&a, "b", true);
    dir.follow_or_unfollow(&b, "a", true);

    dir.block(&b, &a);

    assert_eq!(a.following_count(), 0);
    assert_eq!(a.follower_count(), 0);
    assert_eq!(b.following_count(), 0);
    assert_eq!(b.follower_count(), 0);

    // a cannot follow b back; b may still follow a
    assert!(!dir.follow_or_unfollow(&a, "b", true));
    assert!(dir.follow_or_unfollow(&b, "a", true));
}

#[test]
fn test_add_blocked_by_is_idempotent() {
    let dir = directory();
    let a = dir.register("a", "pw", 2000, 1, 1).unwrap();

    assert!(a.add_blocked_by("b"));
    assert!(!a.add_blocked_by("b"));
    assert!(a.is_blocked_by("b"));
}

// =============================================================================
// History & Stats
// =============================================================================

#[test]
fn test_post_count_ignores_pms() {
    let dir = directory();
    let a = dir.register("a", "pw", 2000, 1, 1).unwrap();

    dir.add_to_history(Notification::public("a", "one"));
    dir.add_to_history(Notification::private("a", "secret"));
    dir.add_to_history(Notification::public("b", "other"));
    dir.add_to_history(Notification::public("a", "two"));

    assert_eq!(dir.history_len(), 4);
    assert_eq!(dir.post_count("a"), 2);

    let stats = dir.stats_of(&a);
    assert_eq!(stats.posts, 2);
    assert_eq!(stats.age, 24);
}
