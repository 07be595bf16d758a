use attendance_payroll::AppError;
use attendance_payroll::database::models::SalaryType;
use pretty_assertions::assert_eq;

mod common;

use common::{TestContext, date, money, monthly_structure};

#[actix_web::test]
async fn test_create_applies_insurance_defaults() {
    let ctx = TestContext::new().await;
    let employee = ctx.employee().await;
    let manager = ctx.manager().await;

    let mut input = monthly_structure(employee.id, "9000000", date(2024, 1, 1));
    input.health_insurance_rate = Some(money("0.02"));
    let structure = ctx
        .state
        .salary_structure_service
        .create(input, &manager)
        .await
        .unwrap();

    assert!(structure.is_active);
    assert_eq!(structure.created_by, Some(manager.id));
    assert_eq!(structure.social_insurance_rate, money("0.08"));
    assert_eq!(structure.health_insurance_rate, money("0.02"));
    assert_eq!(structure.unemployment_insurance_rate, money("0.01"));
}

#[actix_web::test]
async fn test_overlapping_structures_conflict() {
    let ctx = TestContext::new().await;
    let employee = ctx.employee().await;
    let manager = ctx.manager().await;
    let service = &ctx.state.salary_structure_service;

    let mut first = monthly_structure(employee.id, "9000000", date(2024, 1, 1));
    first.end_date = Some(date(2024, 6, 30));
    let first = service.create(first, &manager).await.unwrap();

    let overlapping = service
        .create(
            monthly_structure(employee.id, "9500000", date(2024, 6, 1)),
            &manager,
        )
        .await;
    assert!(matches!(overlapping, Err(AppError::Conflict(_))));

    let following = service
        .create(
            monthly_structure(employee.id, "9500000", date(2024, 7, 1)),
            &manager,
        )
        .await
        .unwrap();

    let active = service
        .active_for(employee.id, date(2024, 8, 15), &employee)
        .await
        .unwrap();
    assert_eq!(active.id, following.id);
    let earlier = service
        .active_for(employee.id, date(2024, 3, 15), &employee)
        .await
        .unwrap();
    assert_eq!(earlier.id, first.id);

    let listed = service.list_for_user(employee.id, &manager).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, following.id);
}

#[actix_web::test]
async fn test_deactivated_structure_frees_the_range() {
    let ctx = TestContext::new().await;
    let employee = ctx.employee().await;
    let manager = ctx.manager().await;
    let service = &ctx.state.salary_structure_service;

    let original = service
        .create(
            monthly_structure(employee.id, "9000000", date(2024, 1, 1)),
            &manager,
        )
        .await
        .unwrap();
    let deactivated = service.deactivate(original.id, &manager).await.unwrap();
    assert!(!deactivated.is_active);

    let none = service
        .active_for(employee.id, date(2024, 2, 1), &manager)
        .await;
    assert!(matches!(none, Err(AppError::NotFound(_))));

    service
        .create(
            monthly_structure(employee.id, "9900000", date(2024, 1, 1)),
            &manager,
        )
        .await
        .unwrap();
}

#[actix_web::test]
async fn test_invalid_structures_are_rejected() {
    let ctx = TestContext::new().await;
    let employee = ctx.employee().await;
    let manager = ctx.manager().await;
    let service = &ctx.state.salary_structure_service;

    let mut hourly = monthly_structure(employee.id, "0", date(2024, 1, 1));
    hourly.salary_type = SalaryType::Hourly;
    let result = service.create(hourly.clone(), &manager).await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));

    hourly.hourly_rate = Some(money("0"));
    let result = service.create(hourly.clone(), &manager).await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));

    let negative = monthly_structure(employee.id, "-1", date(2024, 1, 1));
    let result = service.create(negative, &manager).await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));

    let mut inverted = monthly_structure(employee.id, "100", date(2024, 5, 1));
    inverted.end_date = Some(date(2024, 4, 30));
    let result = service.create(inverted, &manager).await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));

    let by_employee = service
        .create(
            monthly_structure(employee.id, "100", date(2024, 1, 1)),
            &employee,
        )
        .await;
    assert!(matches!(by_employee, Err(AppError::PermissionDenied(_))));

    hourly.hourly_rate = Some(money("55000"));
    let created = service.create(hourly, &manager).await.unwrap();
    assert_eq!(created.salary_type, SalaryType::Hourly);
}

#[actix_web::test]
async fn test_employees_only_read_their_own_structure() {
    let ctx = TestContext::new().await;
    let employee = ctx.employee().await;
    let colleague = ctx.employee().await;
    let manager = ctx.manager().await;
    let structure = ctx
        .salary_structure(&employee, "9000000", date(2024, 1, 1), &manager)
        .await;

    let own = ctx
        .state
        .salary_structure_service
        .get(structure.id, &employee)
        .await
        .unwrap();
    assert_eq!(own.base_salary, money("9000000"));

    let other = ctx
        .state
        .salary_structure_service
        .get(structure.id, &colleague)
        .await;
    assert!(matches!(other, Err(AppError::PermissionDenied(_))));
}
