use std::sync::Arc;

use bigdecimal::{BigDecimal, Zero};
use chrono::NaiveDate;
use uuid::Uuid;

use super::violations::require_manager;
use crate::config::PayrollConfig;
use crate::database::models::{SalaryStructure, SalaryStructureInput, SalaryType, UserProfile};
use crate::database::repositories::SalaryStructureRepository;
use crate::error::AppError;

fn check_non_negative(name: &str, value: &BigDecimal) -> Result<(), AppError> {
    if value < &BigDecimal::zero() {
        return Err(AppError::BadRequest(format!("{} must not be negative", name)));
    }
    Ok(())
}

/// Validate a structure before it is written
pub fn validate_structure(input: &SalaryStructureInput) -> Result<(), AppError> {
    check_non_negative("Base salary", &input.base_salary)?;

    if input.salary_type == SalaryType::Hourly {
        match &input.hourly_rate {
            Some(rate) if rate > &BigDecimal::zero() => {}
            _ => {
                return Err(AppError::BadRequest(
                    "Hourly salary structures require a positive hourly rate".to_string(),
                ));
            }
        }
    }

    let optional_rates = [
        ("Hourly rate", &input.hourly_rate),
        ("Overtime rate", &input.overtime_rate),
        ("Holiday rate", &input.holiday_rate),
        ("Weekend rate", &input.weekend_rate),
        ("Social insurance rate", &input.social_insurance_rate),
        ("Health insurance rate", &input.health_insurance_rate),
        ("Unemployment insurance rate", &input.unemployment_insurance_rate),
    ];
    for (name, value) in optional_rates {
        if let Some(value) = value {
            check_non_negative(name, value)?;
        }
    }

    for (name, value) in [
        ("Transport allowance", &input.transport_allowance),
        ("Meal allowance", &input.meal_allowance),
        ("Phone allowance", &input.phone_allowance),
        ("Other allowances", &input.other_allowances),
        ("Personal income tax", &input.personal_income_tax),
        ("Other deductions", &input.other_deductions),
    ] {
        check_non_negative(name, value)?;
    }

    if let Some(end_date) = input.end_date {
        if end_date < input.effective_date {
            return Err(AppError::BadRequest(
                "End date must not be before the effective date".to_string(),
            ));
        }
    }

    Ok(())
}

#[derive(Clone)]
pub struct SalaryStructureService {
    structures: Arc<dyn SalaryStructureRepository>,
    config: PayrollConfig,
}

impl SalaryStructureService {
    pub fn new(structures: Arc<dyn SalaryStructureRepository>, config: PayrollConfig) -> Self {
        Self { structures, config }
    }

    pub async fn create(
        &self,
        mut input: SalaryStructureInput,
        actor: &UserProfile,
    ) -> Result<SalaryStructure, AppError> {
        require_manager(actor)?;
        validate_structure(&input)?;

        input.created_by = Some(actor.id);
        input
            .social_insurance_rate
            .get_or_insert_with(|| self.config.default_social_insurance_rate.clone());
        input
            .health_insurance_rate
            .get_or_insert_with(|| self.config.default_health_insurance_rate.clone());
        input
            .unemployment_insurance_rate
            .get_or_insert_with(|| self.config.default_unemployment_insurance_rate.clone());

        let user_id = input.user_id;
        let effective_date = input.effective_date;
        let structure = self
            .structures
            .create_if_no_overlap(input)
            .await?
            .ok_or_else(|| {
                AppError::Conflict(format!(
                    "User {} already has an active salary structure overlapping {}",
                    user_id, effective_date
                ))
            })?;

        log::info!(
            "Salary structure {} created for user {} from {}",
            structure.id,
            user_id,
            effective_date
        );
        Ok(structure)
    }

    pub async fn get(&self, id: Uuid, actor: &UserProfile) -> Result<SalaryStructure, AppError> {
        let structure = self
            .structures
            .find(id)
            .await?
            .ok_or_else(|| AppError::not_found("Salary structure", id))?;

        if !actor.can_access_user_resource(structure.user_id) {
            return Err(AppError::PermissionDenied(
                "You can only view your own salary structure".to_string(),
            ));
        }
        Ok(structure)
    }

    pub async fn active_for(
        &self,
        user_id: Uuid,
        date: NaiveDate,
        actor: &UserProfile,
    ) -> Result<SalaryStructure, AppError> {
        if !actor.can_access_user_resource(user_id) {
            return Err(AppError::PermissionDenied(
                "You can only view your own salary structure".to_string(),
            ));
        }

        self.structures
            .active_for(user_id, date)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "No active salary structure for user {} on {}",
                    user_id, date
                ))
            })
    }

    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        actor: &UserProfile,
    ) -> Result<Vec<SalaryStructure>, AppError> {
        if !actor.can_access_user_resource(user_id) {
            return Err(AppError::PermissionDenied(
                "You can only view your own salary structures".to_string(),
            ));
        }
        Ok(self.structures.list_for_user(user_id).await?)
    }

    pub async fn deactivate(
        &self,
        id: Uuid,
        actor: &UserProfile,
    ) -> Result<SalaryStructure, AppError> {
        require_manager(actor)?;

        self.structures
            .deactivate(id)
            .await?
            .ok_or_else(|| AppError::not_found("Salary structure", id))
    }
}
