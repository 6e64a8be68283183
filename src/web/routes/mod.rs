pub mod checkin_routes;
