pub mod attendance;
pub mod detection;
pub mod evidence;
pub mod explanations;
pub mod payrolls;
pub mod salary_structures;
pub mod shared;
pub mod shifts;
pub mod violations;
