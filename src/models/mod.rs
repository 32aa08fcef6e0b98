pub mod captured_image;
pub mod detector;
pub mod permit_status;
pub mod role;
pub mod session;
pub mod site_time;
pub mod user;
pub mod work_permit;
pub mod work_permit_query;
