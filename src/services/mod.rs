pub mod checkin_service;
