//! Integration tests for the garden lifecycle.
//!
//! Exercises the full facade over a real SQLite store.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use garden_core::{
    extract_keywords, Author, ErrorCode, EventBus, Garden, GardenConfig, GardenError,
    GardenEvent, GardenStore, Idea, IdeaQuery, IdeaStatus, PlantOptions, Section,
    SqliteGardenStore,
};

const USER: &str = "user1";

const REFUSE_PROFILE_WRITES: &str = r#"
    CREATE TRIGGER refuse_profile_insert BEFORE INSERT ON user_profiles
    BEGIN SELECT RAISE(ABORT, 'profile writes refused'); END;
    CREATE TRIGGER refuse_profile_update BEFORE UPDATE ON user_profiles
    BEGIN SELECT RAISE(ABORT, 'profile writes refused'); END;
"#;

const ALLOW_PROFILE_WRITES: &str = r#"
    DROP TRIGGER refuse_profile_insert;
    DROP TRIGGER refuse_profile_update;
"#;

/// Run SQL against the garden database through a second connection.
fn tamper(path: &Path, sql: &str) {
    let conn = rusqlite::Connection::open(path).unwrap();
    conn.execute_batch(sql).unwrap();
}

fn file_garden(dir: &tempfile::TempDir, capacity: usize) -> (Garden, PathBuf) {
    let path = dir.path().join("garden.db");
    let config = GardenConfig::builder()
        .db_path(path.clone())
        .archive_capacity(capacity)
        .build()
        .unwrap();
    (Garden::open(config).unwrap(), path)
}

fn plant(garden: &Garden, title: &str) -> Idea {
    garden
        .create_idea(USER, title, "felt like it", PlantOptions::forced())
        .unwrap()
        .idea
        .expect("forced capture is never blocked")
}

fn refine(garden: &Garden, idea: &Idea, times: usize) {
    for i in 0..times {
        garden
            .refine_idea(USER, idea.id, &format!("thought {}", i), Author::Human)
            .unwrap();
    }
}

/// Capture, three refinements to REFINING, five to MATURE, then finalize.
#[test]
fn test_trip_scenario() {
    let garden = Garden::in_memory(GardenConfig::default()).unwrap();

    let outcome = garden
        .create_idea(USER, "Plan a trip", "felt like it", PlantOptions::default())
        .unwrap();
    let idea = outcome.idea.unwrap();
    assert_eq!(idea.refinements, 0);
    assert_eq!(idea.section, Section::Captured);

    let mut promotions = Vec::new();
    for i in 0..5 {
        let step = garden
            .refine_idea(USER, idea.id, &format!("step {}", i), Author::Human)
            .unwrap();
        promotions.push((step.idea.refinements, step.promoted, step.new_section));
    }
    assert_eq!(promotions[2], (3, true, Some(Section::Refining)));
    assert_eq!(promotions[3], (4, false, None));
    assert_eq!(promotions[4], (5, true, Some(Section::Mature)));

    let done = garden
        .finalize_idea(USER, idea.id, Author::Human)
        .unwrap();
    assert_eq!(done.idea.status, IdeaStatus::Finalized);
    assert_eq!(done.idea.section, Section::Archive);
    assert_eq!(done.unlocked, vec!["First Harvest"]);

    let profile = garden.profile(USER).unwrap();
    // 10 capture + 5 * 5 refine + 50 finalize + 50 First Spark + 200 First Harvest
    assert_eq!(profile.xp, 335);
    assert_eq!(profile.level, 6);
}

#[test]
fn test_finalize_below_threshold_fails_then_succeeds() {
    let garden = Garden::in_memory(GardenConfig::default()).unwrap();
    let idea = plant(&garden, "Write a novel");
    refine(&garden, &idea, 4);

    let err = garden
        .finalize_idea(USER, idea.id, Author::Human)
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::IdeaImmature);

    refine(&garden, &idea, 1);
    assert!(garden.finalize_idea(USER, idea.id, Author::Human).is_ok());
}

#[test]
fn test_duplicate_gate_blocks_near_copy() {
    let garden = Garden::in_memory(GardenConfig::default()).unwrap();
    garden
        .create_idea(USER, "Build a cat app", "pets", PlantOptions::default())
        .unwrap();

    let outcome = garden
        .create_idea(USER, "Build a cat social app", "pets", PlantOptions::default())
        .unwrap();
    assert!(outcome.blocked);
    assert!(outcome.idea.is_none());
    assert!(outcome.similar_matches.iter().any(|m| m.score > 0.6));
}

#[test]
fn test_duplicate_gate_ignores_other_users() {
    let garden = Garden::in_memory(GardenConfig::default()).unwrap();
    garden
        .create_idea("someone-else", "Build a cat app", "pets", PlantOptions::default())
        .unwrap();

    let outcome = garden
        .create_idea(USER, "Build a cat app", "pets", PlantOptions::default())
        .unwrap();
    assert!(!outcome.blocked);
    assert!(outcome.similar_matches.is_empty());
}

#[test]
fn test_keyword_scenario() {
    let keywords = extract_keywords("The global weather is changing very quickly in the garden");
    let mut words: Vec<&str> = keywords.iter().collect();
    words.sort_unstable();
    assert_eq!(words, vec!["changing", "garden", "global", "quickly", "weather"]);
}

/// Seven discarded ideas leave exactly five, and the two oldest are gone.
#[test]
fn test_archive_bounded_to_capacity() {
    let store = Arc::new(SqliteGardenStore::in_memory().unwrap());
    let garden = Garden::new(GardenConfig::default(), store.clone()).unwrap();

    let mut ids = Vec::new();
    for i in 0..7 {
        let idea = plant(&garden, &format!("throwaway thought {}", i));
        garden
            .discard_idea(USER, idea.id, None, Author::Human)
            .unwrap();
        ids.push(idea.id);

        let archived = store
            .list_ideas(USER, &IdeaQuery::section(Section::Archive))
            .unwrap();
        assert!(archived.len() <= 5);
    }

    let archived = garden.overview(USER).unwrap().archived;
    assert_eq!(archived.len(), 5);
    for gone in &ids[..2] {
        assert!(store.get_idea(USER, gone).unwrap().is_none());
        assert!(store.list_logs(gone).unwrap().is_empty());
    }
    for kept in &ids[2..] {
        assert!(store.get_idea(USER, kept).unwrap().is_some());
    }
}

#[test]
fn test_finalized_and_discarded_share_archive() {
    let config = GardenConfig::builder().archive_capacity(2).build().unwrap();
    let garden = Garden::in_memory(config).unwrap();

    let keeper = plant(&garden, "Finish the garden shed");
    refine(&garden, &keeper, 5);
    garden.finalize_idea(USER, keeper.id, Author::Human).unwrap();

    for title in ["Juggling lessons", "Sourdough starter"] {
        let idea = plant(&garden, title);
        garden.discard_idea(USER, idea.id, None, Author::Human).unwrap();
    }

    let overview = garden.overview(USER).unwrap();
    assert_eq!(overview.archived.len(), 2);
    assert!(overview.archived.iter().all(|i| i.id != keeper.id));
    // Lifetime counter survives eviction.
    assert_eq!(overview.stats.total_finalized, 1);
}

#[test]
fn test_merge_is_atomic_when_participant_inactive() {
    let store = Arc::new(SqliteGardenStore::in_memory().unwrap());
    let garden = Garden::new(GardenConfig::default(), store.clone()).unwrap();

    let primary = plant(&garden, "Cat app");
    let other = plant(&garden, "Cat photo sharing");
    let finished = plant(&garden, "Cat toys");
    refine(&garden, &finished, 5);
    garden.finalize_idea(USER, finished.id, Author::Human).unwrap();

    let before: Vec<_> = [primary.id, other.id, finished.id]
        .iter()
        .map(|id| store.get_idea(USER, id).unwrap())
        .collect();

    let err = garden
        .merge_ideas(USER, primary.id, &[other.id, finished.id], "all cats", Author::Human)
        .unwrap_err();
    assert!(matches!(err, GardenError::InvalidState { .. }));

    let after: Vec<_> = [primary.id, other.id, finished.id]
        .iter()
        .map(|id| store.get_idea(USER, id).unwrap())
        .collect();
    assert_eq!(before, after);
}

#[test]
fn test_merge_reaches_maturity() {
    let garden = Garden::in_memory(GardenConfig::default()).unwrap();
    let primary = plant(&garden, "Cat app");
    let a = plant(&garden, "Cat photo sharing");
    let b = plant(&garden, "Cat adoption listings");
    refine(&garden, &primary, 2);
    refine(&garden, &a, 2);

    let outcome = garden
        .merge_ideas(USER, primary.id, &[a.id, b.id], "one app for cats", Author::Human)
        .unwrap();
    assert_eq!(outcome.idea.refinements, 5);
    assert_eq!(outcome.idea.section, Section::Mature);

    let overview = garden.overview(USER).unwrap();
    assert_eq!(overview.mature.len(), 1);
    assert_eq!(overview.archived.len(), 2);
    for absorbed in &overview.archived {
        assert_eq!(absorbed.status, IdeaStatus::Discarded);
        assert_eq!(absorbed.merged_into, Some(primary.id));
    }
}

#[test]
fn test_check_achievements_idempotent() {
    let garden = Garden::in_memory(GardenConfig::default()).unwrap();
    for title in ["Alpha project", "Bravo project", "Charlie plan", "Delta route", "Echo song"] {
        plant(&garden, title);
    }

    let xp = garden.profile(USER).unwrap().xp;
    assert!(garden.check_achievements(USER).unwrap().is_empty());
    assert!(garden.check_achievements(USER).unwrap().is_empty());
    assert_eq!(garden.profile(USER).unwrap().xp, xp);

    let names = garden.overview(USER).unwrap().stats.unlocked_achievements;
    assert!(names.contains(&"First Spark".to_string()));
    assert!(names.contains(&"Idea Machine".to_string()));
}

#[test]
fn test_consolidation_suggestions() {
    let garden = Garden::in_memory(GardenConfig::default()).unwrap();
    plant(&garden, "Build a cat app");
    plant(&garden, "Build a cat social app");
    plant(&garden, "Repaint the kitchen");

    let suggestions = garden.consolidation_suggestions(USER).unwrap();
    assert_eq!(suggestions.len(), 1);
    assert_eq!(suggestions[0].others.len(), 1);
    assert!(suggestions[0].similarity >= 0.3);
}

#[tokio::test]
async fn test_event_bus_sees_eviction() {
    let bus = EventBus::new();
    let mut sub = bus.subscribe();
    let config = GardenConfig::builder().archive_capacity(1).build().unwrap();
    let garden = Garden::in_memory(config).unwrap().with_event_bus(bus);

    for title in ["First throwaway", "Second throwaway"] {
        let idea = plant(&garden, title);
        garden.discard_idea(USER, idea.id, None, Author::Human).unwrap();
    }

    let mut evicted = Vec::new();
    while let Some(event) = sub.try_recv() {
        if let GardenEvent::Evicted { idea_ids, .. } = event {
            evicted.extend(idea_ids);
        }
    }
    assert_eq!(evicted.len(), 1);
}

#[test]
fn test_file_backed_store_persists() {
    let dir = tempfile::tempdir().unwrap();
    let config = GardenConfig::builder()
        .db_path(dir.path().join("nested").join("garden.db"))
        .build()
        .unwrap();

    let id = {
        let garden = Garden::open(config.clone()).unwrap();
        plant(&garden, "Plan a trip").id
    };

    let garden = Garden::open(config).unwrap();
    let detail = garden.idea_detail(USER, &id.to_string()).unwrap().unwrap();
    assert_eq!(detail.idea.title, "Plan a trip");
    assert_eq!(garden.profile(USER).unwrap().ideas_created, 1);
}

#[test]
fn test_finalize_rolls_back_when_progress_write_fails() {
    let dir = tempfile::tempdir().unwrap();
    let (garden, path) = file_garden(&dir, 5);
    let idea = plant(&garden, "Plan a trip");
    refine(&garden, &idea, 5);

    tamper(&path, REFUSE_PROFILE_WRITES);
    let err = garden
        .finalize_idea(USER, idea.id, Author::Human)
        .unwrap_err();
    assert!(matches!(err, GardenError::Database { .. }));

    let detail = garden.idea_detail(USER, &idea.id.to_string()).unwrap().unwrap();
    assert_eq!(detail.idea.status, IdeaStatus::Active);
    assert_eq!(detail.idea.section, Section::Mature);
    assert_eq!(detail.logs.len(), 5);
    assert_eq!(garden.profile(USER).unwrap().finalized, 0);

    // Nothing was half-applied, so a retry goes through and counts once.
    tamper(&path, ALLOW_PROFILE_WRITES);
    let done = garden.finalize_idea(USER, idea.id, Author::Human).unwrap();
    assert_eq!(done.idea.status, IdeaStatus::Finalized);
    assert_eq!(done.unlocked, vec!["First Harvest"]);
    assert_eq!(garden.profile(USER).unwrap().finalized, 1);
}

#[test]
fn test_discard_rolls_back_archive_trim_when_progress_write_fails() {
    let dir = tempfile::tempdir().unwrap();
    let (garden, path) = file_garden(&dir, 1);
    let first = plant(&garden, "Juggling lessons");
    garden.discard_idea(USER, first.id, None, Author::Human).unwrap();
    let second = plant(&garden, "Sourdough starter");

    tamper(&path, REFUSE_PROFILE_WRITES);
    let err = garden
        .discard_idea(USER, second.id, Some("no time"), Author::Human)
        .unwrap_err();
    assert!(matches!(err, GardenError::Database { .. }));

    let overview = garden.overview(USER).unwrap();
    assert_eq!(overview.captured.len(), 1);
    assert_eq!(overview.captured[0].id, second.id);
    assert_eq!(overview.archived.len(), 1);
    assert_eq!(overview.archived[0].id, first.id);
    assert_eq!(garden.profile(USER).unwrap().discarded, 1);
}

#[test]
fn test_merge_rolls_back_when_progress_write_fails() {
    let dir = tempfile::tempdir().unwrap();
    let (garden, path) = file_garden(&dir, 5);
    let primary = plant(&garden, "Cat app");
    let other = plant(&garden, "Cat photo sharing");
    let before = garden.profile(USER).unwrap();

    tamper(&path, REFUSE_PROFILE_WRITES);
    let err = garden
        .merge_ideas(USER, primary.id, &[other.id], "one app for cats", Author::Human)
        .unwrap_err();
    assert!(matches!(err, GardenError::Database { .. }));

    for id in [primary.id, other.id] {
        let detail = garden.idea_detail(USER, &id.to_string()).unwrap().unwrap();
        assert_eq!(detail.idea.status, IdeaStatus::Active);
        assert_eq!(detail.idea.refinements, 0);
        assert!(detail.logs.is_empty());
    }
    let after = garden.profile(USER).unwrap();
    assert_eq!(after.refinements, before.refinements);
    assert_eq!(after.discarded, before.discarded);

    tamper(&path, ALLOW_PROFILE_WRITES);
    let outcome = garden
        .merge_ideas(USER, primary.id, &[other.id], "one app for cats", Author::Human)
        .unwrap();
    assert_eq!(outcome.idea.refinements, 1);
    assert_eq!(garden.profile(USER).unwrap().discarded, 1);
}

#[test]
fn test_achievement_failure_keeps_committed_transition() {
    let dir = tempfile::tempdir().unwrap();
    let (garden, path) = file_garden(&dir, 5);
    let idea = plant(&garden, "Plan a trip");
    refine(&garden, &idea, 5);

    tamper(
        &path,
        "CREATE TRIGGER refuse_unlocks BEFORE INSERT ON achievement_unlocks \
         BEGIN SELECT RAISE(ABORT, 'unlocks refused'); END;",
    );
    let done = garden.finalize_idea(USER, idea.id, Author::Human).unwrap();
    assert_eq!(done.idea.status, IdeaStatus::Finalized);
    assert!(done.unlocked.is_empty());
    assert_eq!(garden.profile(USER).unwrap().finalized, 1);

    // The counter is committed, so the next check catches up.
    tamper(&path, "DROP TRIGGER refuse_unlocks;");
    assert_eq!(garden.check_achievements(USER).unwrap(), vec!["First Harvest"]);
}
