pub mod attendance;
pub mod auth;
pub mod detection;
pub mod evidence;
pub mod explanations;
pub mod payroll;
pub mod salary_structures;
pub mod shifts;
pub mod storage;
pub mod user_context;
pub mod violations;

pub use attendance::AttendanceService;
pub use auth::{AuthService, Claims};
pub use detection::ViolationDetectionService;
pub use evidence::EvidenceService;
pub use explanations::ExplanationService;
pub use payroll::PayrollService;
pub use salary_structures::SalaryStructureService;
pub use shifts::ShiftService;
pub use storage::{FileStorage, LocalFileStorage, MemoryFileStorage, StoredFile};
pub use user_context::UserContext;
pub use violations::ViolationService;
