pub mod evaluation_service;
