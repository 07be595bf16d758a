use std::sync::Arc;

use sqlx::PgPool;

pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod services;

pub use config::Config;
pub use error::AppError;

use database::repositories::{
    AttendanceRepository, EvidenceRepository, ExplanationRepository, IdentityDirectory,
    MemoryStore, PayrollRepository, PgAttendanceRepository, PgEvidenceRepository,
    PgExplanationRepository, PgPayrollRepository, PgSalaryStructureRepository,
    PgShiftRepository, PgUserDirectory, PgViolationRepository, SalaryStructureRepository,
    ShiftRepository, ViolationRepository,
};
use services::{
    AttendanceService, AuthService, EvidenceService, ExplanationService, FileStorage,
    PayrollService, SalaryStructureService, ShiftService, ViolationDetectionService,
    ViolationService,
};

/// One handle per persistence seam.
#[derive(Clone)]
pub struct Repositories {
    pub identity: Arc<dyn IdentityDirectory>,
    pub shifts: Arc<dyn ShiftRepository>,
    pub attendance: Arc<dyn AttendanceRepository>,
    pub violations: Arc<dyn ViolationRepository>,
    pub explanations: Arc<dyn ExplanationRepository>,
    pub evidence: Arc<dyn EvidenceRepository>,
    pub salary_structures: Arc<dyn SalaryStructureRepository>,
    pub payrolls: Arc<dyn PayrollRepository>,
}

impl Repositories {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            identity: Arc::new(PgUserDirectory::new(pool.clone())),
            shifts: Arc::new(PgShiftRepository::new(pool.clone())),
            attendance: Arc::new(PgAttendanceRepository::new(pool.clone())),
            violations: Arc::new(PgViolationRepository::new(pool.clone())),
            explanations: Arc::new(PgExplanationRepository::new(pool.clone())),
            evidence: Arc::new(PgEvidenceRepository::new(pool.clone())),
            salary_structures: Arc::new(PgSalaryStructureRepository::new(pool.clone())),
            payrolls: Arc::new(PgPayrollRepository::new(pool)),
        }
    }

    pub fn in_memory(store: Arc<MemoryStore>) -> Self {
        Self {
            identity: store.clone(),
            shifts: store.clone(),
            attendance: store.clone(),
            violations: store.clone(),
            explanations: store.clone(),
            evidence: store.clone(),
            salary_structures: store.clone(),
            payrolls: store,
        }
    }
}

pub struct AppState {
    pub auth_service: AuthService,
    pub attendance_service: AttendanceService,
    pub shift_service: ShiftService,
    pub detection_service: ViolationDetectionService,
    pub violation_service: ViolationService,
    pub explanation_service: ExplanationService,
    pub evidence_service: EvidenceService,
    pub salary_structure_service: SalaryStructureService,
    pub payroll_service: PayrollService,
}

impl AppState {
    pub fn new(repos: Repositories, storage: Arc<dyn FileStorage>, config: &Config) -> Self {
        let evidence_service = EvidenceService::new(
            repos.evidence.clone(),
            repos.explanations.clone(),
            storage,
            config.evidence.clone(),
        );

        Self {
            auth_service: AuthService::new(repos.identity.clone(), config.clone()),
            attendance_service: AttendanceService::new(repos.attendance.clone()),
            shift_service: ShiftService::new(repos.shifts.clone(), repos.identity.clone()),
            detection_service: ViolationDetectionService::new(
                repos.shifts.clone(),
                repos.attendance.clone(),
                repos.violations.clone(),
                config.detection.clone(),
            ),
            violation_service: ViolationService::new(
                repos.violations.clone(),
                config.detection.clone(),
            ),
            explanation_service: ExplanationService::new(
                repos.explanations.clone(),
                repos.violations.clone(),
                evidence_service.clone(),
                config.detection.clone(),
            ),
            evidence_service,
            salary_structure_service: SalaryStructureService::new(
                repos.salary_structures.clone(),
                config.payroll.clone(),
            ),
            payroll_service: PayrollService::new(
                repos.payrolls,
                repos.salary_structures,
                repos.attendance,
                repos.shifts,
                repos.identity,
                config.payroll.clone(),
                config.detection.clone(),
            ),
        }
    }
}
