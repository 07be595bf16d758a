use std::sync::Arc;

use chrono::NaiveDate;
use uuid::Uuid;

use super::violations::require_manager;
use crate::database::models::{
    ScheduledShift, ShiftAssignment, ShiftAssignmentInput, UserProfile, WorkShift, WorkShiftInput,
};
use crate::database::repositories::{IdentityDirectory, ShiftRepository};
use crate::error::AppError;

#[derive(Clone)]
pub struct ShiftService {
    shifts: Arc<dyn ShiftRepository>,
    identity: Arc<dyn IdentityDirectory>,
}

impl ShiftService {
    pub fn new(shifts: Arc<dyn ShiftRepository>, identity: Arc<dyn IdentityDirectory>) -> Self {
        Self { shifts, identity }
    }

    pub async fn create_shift(
        &self,
        mut input: WorkShiftInput,
        actor: &UserProfile,
    ) -> Result<WorkShift, AppError> {
        require_manager(actor)?;

        input.name = input.name.trim().to_string();
        if input.name.is_empty() {
            return Err(AppError::BadRequest("Shift name is required".to_string()));
        }
        if input.break_minutes.is_some_and(|minutes| minutes < 0) {
            return Err(AppError::BadRequest(
                "Break minutes must not be negative".to_string(),
            ));
        }

        Ok(self.shifts.create_shift(input).await?)
    }

    pub async fn get_shift(&self, id: Uuid) -> Result<WorkShift, AppError> {
        self.shifts
            .find_shift(id)
            .await?
            .ok_or_else(|| AppError::not_found("Work shift", id))
    }

    pub async fn deactivate_shift(
        &self,
        id: Uuid,
        actor: &UserProfile,
    ) -> Result<WorkShift, AppError> {
        require_manager(actor)?;

        self.shifts
            .set_shift_active(id, false)
            .await?
            .ok_or_else(|| AppError::not_found("Work shift", id))
    }

    pub async fn create_assignment(
        &self,
        mut input: ShiftAssignmentInput,
        actor: &UserProfile,
    ) -> Result<ShiftAssignment, AppError> {
        require_manager(actor)?;

        if input.end_date.is_some_and(|end| end < input.start_date) {
            return Err(AppError::BadRequest(
                "End date must not be before the start date".to_string(),
            ));
        }

        let shift = self.shifts.find_shift(input.shift_id).await?;
        if !shift.is_some_and(|shift| shift.is_active) {
            return Err(AppError::NotFound(format!(
                "Active work shift {} not found",
                input.shift_id
            )));
        }

        let user = self
            .identity
            .get_user(input.user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User", input.user_id))?;
        if !user.eligible_for_shift_work {
            return Err(AppError::BadRequest(format!(
                "User {} is not eligible for shift work",
                user.id
            )));
        }

        input.created_by = Some(actor.id);
        let (user_id, start_date) = (input.user_id, input.start_date);
        self.shifts
            .create_assignment_if_no_overlap(input)
            .await?
            .ok_or_else(|| {
                AppError::Conflict(format!(
                    "User {} already has an active assignment overlapping {}",
                    user_id, start_date
                ))
            })
    }

    pub async fn deactivate_assignment(
        &self,
        id: Uuid,
        actor: &UserProfile,
    ) -> Result<ShiftAssignment, AppError> {
        require_manager(actor)?;

        self.shifts
            .deactivate_assignment(id)
            .await?
            .ok_or_else(|| AppError::not_found("Shift assignment", id))
    }

    pub async fn list_assignments_for_user(
        &self,
        user_id: Uuid,
        actor: &UserProfile,
    ) -> Result<Vec<ShiftAssignment>, AppError> {
        if !actor.can_access_user_resource(user_id) {
            return Err(AppError::PermissionDenied(
                "You can only view your own assignments".to_string(),
            ));
        }
        Ok(self.shifts.list_assignments_for_user(user_id).await?)
    }

    pub async fn scheduled_on(
        &self,
        date: NaiveDate,
        actor: &UserProfile,
    ) -> Result<Vec<ScheduledShift>, AppError> {
        require_manager(actor)?;
        Ok(self.shifts.scheduled_shifts_on(date).await?)
    }
}
