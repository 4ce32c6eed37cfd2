use rusqlite::Connection;
use taskboard_core::db::open_db_in_memory;
use taskboard_core::{
    BoardRepository, BoardSeed, ErrorKind, MoveIntent, ServiceError, ServiceOptions,
    SqliteBoardRepository, SqliteTaskRepository, TaskPatch, TaskService, ValidationError,
};

struct Fixture {
    conn: Connection,
    todo: String,
    doing: String,
}

impl Fixture {
    fn new() -> Self {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteBoardRepository::try_new(&conn).unwrap();
        let board = repo
            .create_board(&BoardSeed::empty("Board", &["Todo", "Doing"]))
            .unwrap();
        let columns = repo.list_columns(&board.id).unwrap();
        let todo = columns[0].id.clone();
        let doing = columns[1].id.clone();
        Self { conn, todo, doing }
    }

    fn service(&self) -> TaskService<SqliteTaskRepository<'_>> {
        TaskService::new(SqliteTaskRepository::try_new(&self.conn).unwrap())
    }

    fn service_with(&self, options: ServiceOptions) -> TaskService<SqliteTaskRepository<'_>> {
        TaskService::with_options(SqliteTaskRepository::try_new(&self.conn).unwrap(), options)
    }

    /// `(id, position)` pairs of a column in display order.
    fn column(&self, column_id: &str) -> Vec<(String, i64)> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, position FROM tasks WHERE column_id = ?1 ORDER BY position, id;")
            .unwrap();
        stmt.query_map([column_id], |row| Ok((row.get(0)?, row.get(1)?)))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    fn ids(&self, column_id: &str) -> Vec<String> {
        self.column(column_id).into_iter().map(|(id, _)| id).collect()
    }

    /// Records every task row write into `temp.audit`.
    fn start_audit(&self) {
        self.conn
            .execute_batch(
                "CREATE TEMP TABLE audit (op TEXT NOT NULL);
                 CREATE TEMP TRIGGER audit_insert AFTER INSERT ON tasks
                 BEGIN INSERT INTO audit (op) VALUES ('insert'); END;
                 CREATE TEMP TRIGGER audit_update AFTER UPDATE ON tasks
                 BEGIN INSERT INTO audit (op) VALUES ('update'); END;
                 CREATE TEMP TRIGGER audit_delete AFTER DELETE ON tasks
                 BEGIN INSERT INTO audit (op) VALUES ('delete'); END;",
            )
            .unwrap();
    }

    fn audited_writes(&self) -> i64 {
        self.conn
            .query_row("SELECT COUNT(*) FROM audit;", [], |row| row.get(0))
            .unwrap()
    }
}

fn assert_contiguous(positions: &[(String, i64)]) {
    for (index, (_, position)) in positions.iter().enumerate() {
        assert_eq!(*position, index as i64, "positions: {positions:?}");
    }
}

#[test]
fn create_appends_at_column_count() {
    let fixture = Fixture::new();
    let service = fixture.service();

    let first = service.create_task(&fixture.todo, "  first ", None).unwrap();
    let second = service
        .create_task(&fixture.todo, "second", Some("body"))
        .unwrap();

    assert_eq!(first.title, "first");
    assert_eq!(first.position, 0);
    assert_eq!(second.position, 1);
    assert_eq!(second.description.as_deref(), Some("body"));
    assert_eq!(second.column_id, fixture.todo);
}

#[test]
fn create_rejects_unknown_column_and_blank_title() {
    let fixture = Fixture::new();
    let service = fixture.service();
    fixture.start_audit();

    let err = service.create_task("missing", "title", None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(matches!(
        err,
        ServiceError::Validation(ValidationError::UnknownColumn(_))
    ));

    let err = service.create_task(&fixture.todo, "   ", None).unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Validation(ValidationError::TitleRequired)
    ));
    assert_eq!(fixture.audited_writes(), 0);
}

#[test]
fn update_with_empty_title_writes_nothing() {
    let fixture = Fixture::new();
    let service = fixture.service();
    let task = service.create_task(&fixture.todo, "title", None).unwrap();
    fixture.start_audit();

    let patch = TaskPatch {
        title: Some("  ".to_string()),
        description: None,
    };
    let err = service.update_task(&task.id, &patch).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(fixture.audited_writes(), 0);
    assert_eq!(service.get_task(&task.id).unwrap().title, "title");
}

#[test]
fn update_rejects_empty_patch_and_unknown_task() {
    let fixture = Fixture::new();
    let service = fixture.service();

    let err = service
        .update_task("anything", &TaskPatch::default())
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Validation(ValidationError::EmptyPatch)
    ));

    let patch = TaskPatch {
        title: Some("new".to_string()),
        description: None,
    };
    let err = service.update_task("ghost", &patch).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn update_keeps_position_and_clears_description() {
    let fixture = Fixture::new();
    let service = fixture.service();
    service.create_task(&fixture.todo, "a", None).unwrap();
    let task = service
        .create_task(&fixture.todo, "b", Some("details"))
        .unwrap();

    let patch = TaskPatch {
        title: Some("renamed".to_string()),
        description: Some(String::new()),
    };
    let updated = service.update_task(&task.id, &patch).unwrap();

    assert_eq!(updated.title, "renamed");
    assert_eq!(updated.description, None);
    assert_eq!(updated.position, 1);
    assert_eq!(updated.column_id, fixture.todo);
}

#[test]
fn delete_unknown_task_writes_nothing() {
    let fixture = Fixture::new();
    let service = fixture.service();
    service.create_task(&fixture.todo, "a", None).unwrap();
    fixture.start_audit();

    let err = service.delete_task("ghost").unwrap_err();
    assert!(matches!(err, ServiceError::TaskNotFound(id) if id == "ghost"));
    assert_eq!(fixture.audited_writes(), 0);
}

#[test]
fn delete_compacts_remaining_tasks() {
    let fixture = Fixture::new();
    let service = fixture.service();
    let a = service.create_task(&fixture.todo, "a", None).unwrap();
    let b = service.create_task(&fixture.todo, "b", None).unwrap();
    let c = service.create_task(&fixture.todo, "c", None).unwrap();

    let removed = service.delete_task(&b.id).unwrap();
    assert_eq!(removed.id, b.id);
    assert_eq!(fixture.ids(&fixture.todo), vec![a.id, c.id]);
    assert_contiguous(&fixture.column(&fixture.todo));
}

#[test]
fn delete_without_compaction_leaves_gap_that_create_closes() {
    let fixture = Fixture::new();
    let service = fixture.service_with(ServiceOptions {
        compact_on_delete: false,
    });
    let a = service.create_task(&fixture.todo, "a", None).unwrap();
    let b = service.create_task(&fixture.todo, "b", None).unwrap();
    let c = service.create_task(&fixture.todo, "c", None).unwrap();

    service.delete_task(&a.id).unwrap();
    assert_eq!(
        fixture.column(&fixture.todo),
        vec![(b.id.clone(), 1), (c.id.clone(), 2)]
    );

    let d = service.create_task(&fixture.todo, "d", None).unwrap();
    assert_eq!(d.position, 2);
    assert_eq!(fixture.ids(&fixture.todo), vec![b.id, c.id, d.id]);
    assert_contiguous(&fixture.column(&fixture.todo));
}

#[test]
fn move_within_column_reorders() {
    let fixture = Fixture::new();
    let service = fixture.service();
    let t1 = service.create_task(&fixture.todo, "t1", None).unwrap();
    let t2 = service.create_task(&fixture.todo, "t2", None).unwrap();
    let t3 = service.create_task(&fixture.todo, "t3", None).unwrap();

    let outcome = service
        .move_task(&MoveIntent::new(&t3.id, &fixture.todo, &fixture.todo, 0))
        .unwrap();

    assert_eq!(outcome.task.position, 0);
    assert_eq!(outcome.rows_written, 3);
    assert_eq!(fixture.ids(&fixture.todo), vec![t3.id, t1.id, t2.id]);
    assert_contiguous(&fixture.column(&fixture.todo));
}

#[test]
fn move_across_columns_renumbers_both() {
    let fixture = Fixture::new();
    let service = fixture.service();
    let t1 = service.create_task(&fixture.todo, "t1", None).unwrap();
    let t2 = service.create_task(&fixture.todo, "t2", None).unwrap();
    let t3 = service.create_task(&fixture.doing, "t3", None).unwrap();

    let outcome = service
        .move_task(&MoveIntent::new(&t1.id, &fixture.todo, &fixture.doing, 1))
        .unwrap();

    assert_eq!(outcome.task.column_id, fixture.doing);
    assert_eq!(outcome.task.position, 1);
    assert_eq!(fixture.ids(&fixture.todo), vec![t2.id]);
    assert_eq!(fixture.ids(&fixture.doing), vec![t3.id, t1.id]);
    assert_contiguous(&fixture.column(&fixture.todo));
    assert_contiguous(&fixture.column(&fixture.doing));
}

#[test]
fn move_to_current_index_writes_nothing() {
    let fixture = Fixture::new();
    let service = fixture.service();
    service.create_task(&fixture.todo, "t1", None).unwrap();
    let t2 = service.create_task(&fixture.todo, "t2", None).unwrap();
    fixture.start_audit();

    let outcome = service
        .move_task(&MoveIntent::new(&t2.id, &fixture.todo, &fixture.todo, 1))
        .unwrap();

    assert_eq!(outcome.rows_written, 0);
    assert_eq!(outcome.task.position, 1);
    assert_eq!(fixture.audited_writes(), 0);
}

#[test]
fn move_clamps_index_past_end() {
    let fixture = Fixture::new();
    let service = fixture.service();
    let t1 = service.create_task(&fixture.todo, "t1", None).unwrap();
    let t2 = service.create_task(&fixture.doing, "t2", None).unwrap();

    let outcome = service
        .move_task(&MoveIntent::new(&t1.id, &fixture.todo, &fixture.doing, 99))
        .unwrap();

    assert_eq!(outcome.task.position, 1);
    assert_eq!(fixture.ids(&fixture.doing), vec![t2.id, t1.id]);
    assert!(fixture.ids(&fixture.todo).is_empty());
}

#[test]
fn move_rejects_unknown_task_destination_and_stale_source() {
    let fixture = Fixture::new();
    let service = fixture.service();
    let t1 = service.create_task(&fixture.todo, "t1", None).unwrap();
    fixture.start_audit();

    let err = service
        .move_task(&MoveIntent::new("ghost", &fixture.todo, &fixture.doing, 0))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = service
        .move_task(&MoveIntent::new(&t1.id, &fixture.todo, "missing", 0))
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Validation(ValidationError::UnknownColumn(_))
    ));

    let err = service
        .move_task(&MoveIntent::new(&t1.id, &fixture.doing, &fixture.todo, 0))
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Validation(ValidationError::SourceColumnMismatch { .. })
    ));

    assert_eq!(fixture.audited_writes(), 0);
}

#[test]
fn failed_write_rolls_back_whole_move() {
    let fixture = Fixture::new();
    let service = fixture.service();
    let t1 = service.create_task(&fixture.todo, "t1", None).unwrap();
    let t2 = service.create_task(&fixture.todo, "t2", None).unwrap();
    let t3 = service.create_task(&fixture.doing, "t3", None).unwrap();
    let before_todo = fixture.column(&fixture.todo);
    let before_doing = fixture.column(&fixture.doing);

    // Aborts the final write of t2 while t1 and t3 are mid-move.
    fixture
        .conn
        .execute_batch(&format!(
            "CREATE TEMP TRIGGER fail_final_write BEFORE UPDATE OF column_id ON tasks
             WHEN NEW.id = '{}'
             BEGIN SELECT RAISE(ABORT, 'simulated store failure'); END;",
            t2.id
        ))
        .unwrap();

    let err = service
        .move_task(&MoveIntent::new(&t1.id, &fixture.todo, &fixture.doing, 0))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StoreUnavailable);

    assert_eq!(fixture.column(&fixture.todo), before_todo);
    assert_eq!(fixture.column(&fixture.doing), before_doing);
    assert_eq!(service.get_task(&t1.id).unwrap().column_id, fixture.todo);
    assert_eq!(service.get_task(&t3.id).unwrap().position, 0);
}

#[test]
fn operation_sequence_keeps_columns_contiguous() {
    let fixture = Fixture::new();
    let service = fixture.service();
    let mut ids = Vec::new();
    for index in 0..6 {
        let column = if index % 2 == 0 { &fixture.todo } else { &fixture.doing };
        ids.push(service.create_task(column, &format!("task {index}"), None).unwrap().id);
    }

    let columns = [fixture.todo.clone(), fixture.doing.clone()];
    for step in 0..24_usize {
        let task_id = &ids[step % ids.len()];
        let task = service.get_task(task_id).unwrap();
        let destination = &columns[(step / 3) % 2];
        service
            .move_task(&MoveIntent::new(
                task_id.as_str(),
                task.column_id.as_str(),
                destination.as_str(),
                (step * 7) % 5,
            ))
            .unwrap();

        assert_contiguous(&fixture.column(&fixture.todo));
        assert_contiguous(&fixture.column(&fixture.doing));
    }

    service.delete_task(&ids[0]).unwrap();
    service.create_task(&fixture.doing, "late", None).unwrap();
    assert_contiguous(&fixture.column(&fixture.todo));
    assert_contiguous(&fixture.column(&fixture.doing));

    let total = fixture.column(&fixture.todo).len() + fixture.column(&fixture.doing).len();
    assert_eq!(total, 6);
}

#[test]
fn compact_column_closes_gaps() {
    let fixture = Fixture::new();
    let service = fixture.service_with(ServiceOptions {
        compact_on_delete: false,
    });
    let a = service.create_task(&fixture.todo, "a", None).unwrap();
    let b = service.create_task(&fixture.todo, "b", None).unwrap();
    let c = service.create_task(&fixture.todo, "c", None).unwrap();
    service.delete_task(&b.id).unwrap();

    assert_eq!(service.compact_column(&fixture.todo).unwrap(), 1);
    assert_eq!(
        fixture.column(&fixture.todo),
        vec![(a.id, 0), (c.id, 1)]
    );
    assert_eq!(service.compact_column(&fixture.todo).unwrap(), 0);

    let err = service.compact_column("missing").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn list_tasks_reads_display_order() {
    let fixture = Fixture::new();
    let service = fixture.service();
    let a = service.create_task(&fixture.todo, "a", None).unwrap();
    let b = service.create_task(&fixture.todo, "b", None).unwrap();

    let listed: Vec<String> = service
        .list_tasks(&fixture.todo)
        .unwrap()
        .into_iter()
        .map(|task| task.id)
        .collect();
    assert_eq!(listed, vec![a.id, b.id]);
    assert!(service.list_tasks("missing").is_err());
}
