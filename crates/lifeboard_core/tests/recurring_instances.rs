use chrono::{NaiveDate, TimeZone, Utc, Weekday};
use lifeboard_core::{
    apply_instance_completion, generate_recurring_task_instances, is_task_due_on, next_due_date,
    resolve_instance_id, RecurrenceError, RecurrenceSpec, RecurrenceUnit, RecurringCompletion,
    TaskNode, TaskStatus, TaskType,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn recurring(id: &str, task_type: TaskType, spec: RecurrenceSpec) -> TaskNode {
    let mut node = TaskNode::with_id(id, id);
    node.task_type = task_type;
    node.recurrence_pattern = Some(spec);
    node
}

fn completion(day: NaiveDate) -> RecurringCompletion {
    RecurringCompletion::new(day, Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap())
}

#[test]
fn weekly_task_is_only_expanded_on_listed_days() {
    let nodes = vec![recurring(
        "gym",
        TaskType::Recurring,
        RecurrenceSpec::weekly([Weekday::Mon, Weekday::Thu]),
    )];

    // 2024-01-01 is a Monday.
    for (day, expected) in [
        ("2024-01-01", 1),
        ("2024-01-02", 0),
        ("2024-01-03", 0),
        ("2024-01-04", 1),
        ("2024-01-05", 0),
        ("2024-01-06", 0),
        ("2024-01-07", 0),
    ] {
        let instances = generate_recurring_task_instances(&nodes, day).unwrap();
        assert_eq!(instances.len(), expected, "{day}");
    }
}

#[test]
fn completion_record_for_exact_date_marks_instance_completed() {
    let mut node = recurring(
        "gym",
        TaskType::Recurring,
        RecurrenceSpec::weekly([Weekday::Mon, Weekday::Thu]),
    );
    node.recurring_completions = vec![completion(date(2024, 1, 1))];
    let nodes = vec![node];

    let monday = generate_recurring_task_instances(&nodes, "2024-01-01").unwrap();
    assert!(monday[0].completed);
    assert_eq!(monday[0].status, TaskStatus::Completed);

    let thursday = generate_recurring_task_instances(&nodes, "2024-01-04").unwrap();
    assert!(!thursday[0].completed);
    assert_eq!(thursday[0].status, TaskStatus::Pending);
}

#[test]
fn instances_carry_synthesized_ids_and_habit_streaks() {
    let mut habit = recurring("stretch", TaskType::Habit, RecurrenceSpec::daily());
    habit.recurring_completions = vec![completion(date(2024, 1, 1)), completion(date(2024, 1, 2))];
    let plain = recurring("water", TaskType::Recurring, RecurrenceSpec::daily());
    let one_time = TaskNode::with_id("once", "once");
    let nodes = vec![habit, one_time, plain];

    let instances = generate_recurring_task_instances(&nodes, "2024-01-02").unwrap();

    assert_eq!(instances.len(), 2);
    assert_eq!(instances[0].instance_id, "stretch-2024-01-02");
    assert_eq!(instances[0].original_node_id, "stretch");
    assert_eq!(instances[0].current_streak, Some(2));
    assert_eq!(instances[0].longest_streak, Some(2));
    assert_eq!(instances[1].instance_id, "water-2024-01-02");
    assert_eq!(instances[1].current_streak, None);

    let resolved = resolve_instance_id(&instances[1].instance_id).unwrap();
    assert_eq!(resolved.original_id, "water");
    assert_eq!(resolved.date, date(2024, 1, 2));
}

#[test]
fn malformed_patterns_are_never_due_and_do_not_block_others() {
    let broken_weekly = recurring("a", TaskType::Recurring, RecurrenceSpec::new("weekly"));
    let unknown = recurring("b", TaskType::Habit, RecurrenceSpec::new("fortnightly"));
    let mut missing = TaskNode::with_id("c", "c");
    missing.task_type = TaskType::Recurring;
    let healthy = recurring("d", TaskType::Recurring, RecurrenceSpec::daily());
    let nodes = vec![broken_weekly, unknown, missing, healthy];

    let instances = generate_recurring_task_instances(&nodes, "2024-05-05").unwrap();

    assert_eq!(instances.len(), 1);
    assert_eq!(instances[0].original_node_id, "d");
}

#[test]
fn invalid_target_date_fails_fast() {
    let err = generate_recurring_task_instances(&[], "2024-13-01").unwrap_err();
    assert_eq!(err, RecurrenceError::InvalidDate("2024-13-01".to_string()));
}

#[test]
fn end_date_stops_expansion() {
    let spec = RecurrenceSpec {
        end_date: Some(date(2024, 1, 31)),
        ..RecurrenceSpec::daily()
    };
    let node = recurring("read", TaskType::Recurring, spec);

    assert!(is_task_due_on(&node, date(2024, 1, 31)));
    assert!(!is_task_due_on(&node, date(2024, 2, 1)));
    assert_eq!(next_due_date(&node, date(2024, 1, 31), 30), None);
}

#[test]
fn custom_pattern_uses_created_at_as_epoch_fallback() {
    let mut node = recurring(
        "plants",
        TaskType::Recurring,
        RecurrenceSpec {
            interval: Some(3),
            unit: Some("day".to_string()),
            ..RecurrenceSpec::new("custom")
        },
    );
    node.created_at = Some(Utc.with_ymd_and_hms(2024, 1, 10, 15, 30, 0).unwrap());

    assert!(is_task_due_on(&node, date(2024, 1, 10)));
    assert!(!is_task_due_on(&node, date(2024, 1, 11)));
    assert!(is_task_due_on(&node, date(2024, 1, 13)));
    assert_eq!(next_due_date(&node, date(2024, 1, 13), 10), Some(date(2024, 1, 16)));
}

#[test]
fn custom_pattern_without_any_epoch_is_inert() {
    let node = recurring(
        "plants",
        TaskType::Recurring,
        RecurrenceSpec {
            interval: Some(2),
            unit: Some("week".to_string()),
            ..RecurrenceSpec::new("custom")
        },
    );
    assert!(!is_task_due_on(&node, date(2024, 1, 1)));

    let every = recurring(
        "every",
        TaskType::Recurring,
        RecurrenceSpec::every(2, RecurrenceUnit::Week, date(2024, 1, 1)),
    );
    assert!(is_task_due_on(&every, date(2024, 1, 15)));
}

#[test]
fn completing_instance_writes_back_to_original_without_duplicates() {
    let mut habit = recurring("stretch", TaskType::Habit, RecurrenceSpec::daily());
    habit.recurring_completions = vec![completion(date(2024, 1, 1))];
    let nodes = vec![habit];
    let now = Utc.with_ymd_and_hms(2024, 1, 2, 21, 0, 0).unwrap();

    let write_back =
        apply_instance_completion(&nodes, "stretch-2024-01-02", true, now).unwrap();
    assert_eq!(write_back.original_id, "stretch");
    assert_eq!(
        write_back
            .recurring_completions
            .iter()
            .map(|record| record.date)
            .collect::<Vec<_>>(),
        vec![date(2024, 1, 1), date(2024, 1, 2)]
    );
    assert_eq!(write_back.current_streak, Some(2));
    assert_eq!(write_back.longest_streak, Some(2));

    let repeated =
        apply_instance_completion(&nodes, "stretch-2024-01-01", true, now).unwrap();
    assert_eq!(repeated.recurring_completions.len(), 1);
    assert_eq!(
        repeated.recurring_completions[0],
        completion(date(2024, 1, 1))
    );
}

#[test]
fn uncompleting_instance_removes_only_that_date() {
    let mut node = recurring("water", TaskType::Recurring, RecurrenceSpec::daily());
    node.recurring_completions = vec![completion(date(2024, 1, 1)), completion(date(2024, 1, 2))];
    let nodes = vec![node];
    let now = Utc.with_ymd_and_hms(2024, 1, 2, 21, 0, 0).unwrap();

    let write_back = apply_instance_completion(&nodes, "water-2024-01-02", false, now).unwrap();

    assert_eq!(write_back.recurring_completions.len(), 1);
    assert_eq!(write_back.recurring_completions[0].date, date(2024, 1, 1));
    assert_eq!(write_back.current_streak, None);
}

#[test]
fn write_back_rejects_bad_instance_references() {
    let nodes = vec![TaskNode::with_id("once", "once")];
    let now = Utc.with_ymd_and_hms(2024, 1, 2, 21, 0, 0).unwrap();

    assert_eq!(
        apply_instance_completion(&nodes, "once", true, now).unwrap_err(),
        RecurrenceError::InvalidInstanceId("once".to_string())
    );
    assert_eq!(
        apply_instance_completion(&nodes, "ghost-2024-01-02", true, now).unwrap_err(),
        RecurrenceError::TaskNotFound("ghost".to_string())
    );
    assert_eq!(
        apply_instance_completion(&nodes, "once-2024-01-02", true, now).unwrap_err(),
        RecurrenceError::NotRecurring("once".to_string())
    );
}

#[test]
fn write_back_rejects_completing_a_day_with_no_occurrence() {
    let mut gym = recurring(
        "gym",
        TaskType::Recurring,
        RecurrenceSpec::weekly([Weekday::Mon, Weekday::Thu]),
    );
    // 2024-01-02 is a Tuesday.
    gym.recurring_completions = vec![completion(date(2024, 1, 2))];
    let broken = recurring("broken", TaskType::Habit, RecurrenceSpec::new("hourly"));
    let nodes = vec![gym, broken];
    let now = Utc.with_ymd_and_hms(2024, 1, 2, 21, 0, 0).unwrap();

    assert_eq!(
        apply_instance_completion(&nodes, "gym-2024-01-02", true, now).unwrap_err(),
        RecurrenceError::NotDue {
            task_id: "gym".to_string(),
            date: date(2024, 1, 2)
        }
    );
    assert!(matches!(
        apply_instance_completion(&nodes, "broken-2024-01-02", true, now),
        Err(RecurrenceError::NotDue { .. })
    ));

    let cleared = apply_instance_completion(&nodes, "gym-2024-01-02", false, now).unwrap();
    assert!(cleared.recurring_completions.is_empty());
}
