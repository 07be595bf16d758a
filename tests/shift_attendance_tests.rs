use attendance_payroll::AppError;
use attendance_payroll::database::models::{
    AttendanceLogInput, ShiftAssignmentInput, UserProfile, UserRole, WorkShiftInput,
};
use chrono::NaiveTime;
use pretty_assertions::assert_eq;
use uuid::Uuid;

mod common;

use common::{TestContext, at, date};

fn night_shift() -> WorkShiftInput {
    WorkShiftInput {
        name: "  Night  ".to_string(),
        start_time: NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
        end_time: NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
        break_minutes: Some(30),
        description: None,
    }
}

#[actix_web::test]
async fn test_shift_management_is_manager_only() {
    let ctx = TestContext::new().await;
    let employee = ctx.employee().await;
    let manager = ctx.manager().await;
    let shifts = &ctx.state.shift_service;

    let denied = shifts.create_shift(night_shift(), &employee).await;
    assert!(matches!(denied, Err(AppError::PermissionDenied(_))));

    let mut unnamed = night_shift();
    unnamed.name = "   ".to_string();
    let invalid = shifts.create_shift(unnamed, &manager).await;
    assert!(matches!(invalid, Err(AppError::BadRequest(_))));

    let shift = shifts.create_shift(night_shift(), &manager).await.unwrap();
    assert_eq!(shift.name, "Night");
    assert!(shift.is_active);

    let deactivated = shifts.deactivate_shift(shift.id, &manager).await.unwrap();
    assert!(!deactivated.is_active);
    assert!(!shifts.get_shift(shift.id).await.unwrap().is_active);

    let missing = shifts.deactivate_shift(Uuid::new_v4(), &manager).await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));
}

#[actix_web::test]
async fn test_assignment_rules() {
    let ctx = TestContext::new().await;
    let employee = ctx.employee().await;
    let manager = ctx.manager().await;
    let shift = ctx.shift("08:00", "17:00").await;
    let shifts = &ctx.state.shift_service;

    let input = |start, end| ShiftAssignmentInput {
        user_id: employee.id,
        shift_id: shift.id,
        start_date: start,
        end_date: end,
        created_by: None,
    };

    let first = shifts
        .create_assignment(input(date(2024, 3, 1), Some(date(2024, 3, 31))), &manager)
        .await
        .unwrap();
    assert_eq!(first.created_by, Some(manager.id));

    let overlapping = shifts
        .create_assignment(input(date(2024, 3, 15), None), &manager)
        .await;
    assert!(matches!(overlapping, Err(AppError::Conflict(_))));

    let inverted = shifts
        .create_assignment(input(date(2024, 5, 2), Some(date(2024, 5, 1))), &manager)
        .await;
    assert!(matches!(inverted, Err(AppError::BadRequest(_))));

    shifts
        .create_assignment(input(date(2024, 4, 1), None), &manager)
        .await
        .unwrap();

    let scheduled = shifts.scheduled_on(date(2024, 3, 20), &manager).await.unwrap();
    assert_eq!(scheduled.len(), 1);
    assert_eq!(scheduled[0].assignment_id, first.id);
    assert_eq!(scheduled[0].shift_name, shift.name);

    shifts.deactivate_assignment(first.id, &manager).await.unwrap();
    assert!(shifts.scheduled_on(date(2024, 3, 20), &manager).await.unwrap().is_empty());

    let mine = shifts
        .list_assignments_for_user(employee.id, &employee)
        .await
        .unwrap();
    assert_eq!(mine.len(), 2);
}

#[actix_web::test]
async fn test_assignment_needs_active_shift_and_eligible_user() {
    let ctx = TestContext::new().await;
    let manager = ctx.manager().await;
    let shift = ctx.shift("08:00", "17:00").await;
    let contractor = UserProfile {
        id: Uuid::new_v4(),
        full_name: "Day Contractor".to_string(),
        email: "contractor@example.com".to_string(),
        department: None,
        role: UserRole::Employee,
        eligible_for_shift_work: false,
    };
    ctx.store.add_user(contractor.clone()).await;
    let shifts = &ctx.state.shift_service;

    let ineligible = shifts
        .create_assignment(
            ShiftAssignmentInput {
                user_id: contractor.id,
                shift_id: shift.id,
                start_date: date(2024, 3, 1),
                end_date: None,
                created_by: None,
            },
            &manager,
        )
        .await;
    assert!(matches!(ineligible, Err(AppError::BadRequest(_))));

    let employee = ctx.employee().await;
    shifts.deactivate_shift(shift.id, &manager).await.unwrap();
    let inactive = shifts
        .create_assignment(
            ShiftAssignmentInput {
                user_id: employee.id,
                shift_id: shift.id,
                start_date: date(2024, 3, 1),
                end_date: None,
                created_by: None,
            },
            &manager,
        )
        .await;
    assert!(matches!(inactive, Err(AppError::NotFound(_))));
}

#[actix_web::test]
async fn test_overnight_check_out_closes_previous_day() {
    let ctx = TestContext::new().await;
    let employee = ctx.employee().await;
    let attendance = &ctx.state.attendance_service;

    let opened = attendance
        .check_in(employee.id, at(date(2024, 3, 4), "22:00"), &employee)
        .await
        .unwrap();
    let closed = attendance
        .check_out(employee.id, at(date(2024, 3, 5), "06:05"), &employee)
        .await
        .unwrap();

    assert_eq!(closed.id, opened.id);
    assert_eq!(closed.log_date, date(2024, 3, 4));
    assert_eq!(closed.check_out, Some(at(date(2024, 3, 5), "06:05")));

    let again = attendance
        .check_out(employee.id, at(date(2024, 3, 5), "06:10"), &employee)
        .await;
    assert!(matches!(again, Err(AppError::NotFound(_))));

    let nothing_open = attendance
        .check_out(employee.id, at(date(2024, 3, 8), "17:00"), &employee)
        .await;
    assert!(matches!(nothing_open, Err(AppError::NotFound(_))));
}

#[actix_web::test]
async fn test_check_out_rules() {
    let ctx = TestContext::new().await;
    let employee = ctx.employee().await;
    let colleague = ctx.employee().await;
    let attendance = &ctx.state.attendance_service;
    let day = date(2024, 3, 4);

    let foreign = attendance.check_in(employee.id, at(day, "08:00"), &colleague).await;
    assert!(matches!(foreign, Err(AppError::PermissionDenied(_))));

    attendance
        .check_in(employee.id, at(day, "08:00"), &employee)
        .await
        .unwrap();
    let backwards = attendance
        .check_out(employee.id, at(day, "07:30"), &employee)
        .await;
    assert!(matches!(backwards, Err(AppError::BadRequest(_))));

    attendance
        .check_out(employee.id, at(day, "17:00"), &employee)
        .await
        .unwrap();
    let twice = attendance
        .check_out(employee.id, at(day, "17:30"), &employee)
        .await;
    assert!(matches!(twice, Err(AppError::Conflict(_))));
}

#[actix_web::test]
async fn test_recorded_logs_are_unique_per_day() {
    let ctx = TestContext::new().await;
    let employee = ctx.employee().await;
    let manager = ctx.manager().await;
    let attendance = &ctx.state.attendance_service;
    let day = date(2024, 3, 6);

    let input = || AttendanceLogInput {
        user_id: employee.id,
        log_date: day,
        check_in: Some(at(day, "08:00")),
        check_out: Some(at(day, "17:00")),
        notes: Some("badge import".to_string()),
    };

    let by_employee = attendance.record(input(), &employee).await;
    assert!(matches!(by_employee, Err(AppError::PermissionDenied(_))));

    let mut inverted = input();
    inverted.check_out = Some(at(day, "07:00"));
    let invalid = attendance.record(inverted, &manager).await;
    assert!(matches!(invalid, Err(AppError::BadRequest(_))));

    let log = attendance.record(input(), &manager).await.unwrap();
    assert_eq!(attendance.get(log.id, &employee).await.unwrap().id, log.id);

    let duplicate = attendance.record(input(), &manager).await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));

    let listed = attendance
        .list_for_user(employee.id, date(2024, 3, 1), date(2024, 3, 31), &employee)
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);

    let inverted_range = attendance
        .list_for_user(employee.id, date(2024, 3, 31), date(2024, 3, 1), &employee)
        .await;
    assert!(matches!(inverted_range, Err(AppError::BadRequest(_))));
}
