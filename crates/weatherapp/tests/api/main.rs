mod helpers;
mod storage_failures;
mod weather_api;
