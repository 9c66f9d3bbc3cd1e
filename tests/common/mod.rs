//! Shared fixtures for the integration tests

#![allow(dead_code)]

use booking_etl::extract::csv::land_delimited;
use booking_etl::extract::{BOOKINGS_TABLE, DEFAULT_NULL_VALUES, USERS_TABLE};
use booking_etl::staging::{StagingDb, quote_ident};
use booking_etl::transform::RawTables;

pub const BOOKINGS_HEADER: &str = "hotel,is_canceled,lead_time,arrival_date_year,\
arrival_date_month,arrival_date_week_number,arrival_date_day_of_month,stays_in_weekend_nights,\
stays_in_week_nights,adults,children,babies,meal,country,market_segment,distribution_channel,\
is_repeated_guest,previous_cancellations,previous_bookings_not_canceled,reserved_room_type,\
assigned_room_type,booking_changes,deposit_type,agent,company,days_in_waiting_list,\
customer_type,adr,required_car_parking_spaces,total_of_special_requests,reservation_status,\
reservation_status_date";

/// One bookings line; fields not under test are fixed
pub fn booking_line(
    hotel: &str,
    lead_time: u32,
    year: i32,
    month: &str,
    day: u32,
    meal: &str,
    country: &str,
    agent: &str,
    status_date: &str,
) -> String {
    format!(
        "{hotel},0,{lead_time},{year},{month},27,{day},0,1,2,0,0,{meal},{country},\
Direct,Direct,0,0,0,A,A,0,No Deposit,{agent},NULL,0,Transient,75.5,0,1,Check-Out,{status_date}"
    )
}

/// Bookings covering the recoverable anomalies:
/// an `Undefined` meal, a missing country, missing agents, an exact
/// duplicate and an impossible arrival date.
pub fn bookings_csv() -> String {
    let lines = [
        BOOKINGS_HEADER.to_string(),
        booking_line("Resort Hotel", 10, 2015, "July", 1, "BB", "PRT", "9", "01/07/2015"),
        booking_line("City Hotel", 20, 2015, "July", 1, "Undefined", "", "9", "02/07/2015"),
        booking_line("City Hotel", 30, 2015, "August", 5, "HB", "GBR", "240", "07/08/2015"),
        booking_line("Resort Hotel", 40, 2016, "February", 29, "BB", "GBR", "NULL", "03/03/2016"),
        booking_line("Resort Hotel", 10, 2015, "July", 1, "BB", "PRT", "9", "01/07/2015"),
        booking_line("City Hotel", 50, 2016, "February", 30, "BB", "ESP", "240", "not a date"),
    ];
    let mut csv = lines.join("\n");
    csv.push('\n');
    csv
}

pub const USERS_HEADER: &str = "id,name,username,email,address,phone,website,company";

const ROMAGUERA: &str = "\"{'name': 'Romaguera-Crona', \
'catchPhrase': 'Multi-layered client-server neural-net', 'bs': 'harness real-time e-markets'}\"";

/// Users: a phone extension, an unparseable latitude, an invalid e-mail
/// and a missing phone. Two users share a company.
pub fn users_csv() -> String {
    let lines = [
        USERS_HEADER.to_string(),
        format!(
            "1,Leanne Graham,Bret,Sincere@april.biz,\"{{'street': 'Kulas Light', \
'suite': 'Apt. 556', 'city': 'Gwenborough', 'zipcode': '92998-3874', \
'geo': {{'lat': '-37.3159', 'lng': '81.1496'}}}}\",1-770-736-8031 x56442,hildegard.org,{ROMAGUERA}"
        ),
        "2,Ervin Howell,Antonette,Shanna@melissa.tv,\"{'street': 'Victor Plains', \
'suite': 'Suite 879', 'city': 'Wisokyburgh', 'zipcode': '90566-7771', \
'geo': {'lat': 'n/a', 'lng': '-34.4618'}}\",010-692-6593 x09125,http://anastasia.net,\
\"{'name': 'Deckow-Crist', 'catchPhrase': 'Proactive didactic contingency', \
'bs': 'synergize scalable supply-chains'}\""
            .to_string(),
        format!(
            "3,Clementine Bauch,Samantha,not-an-email,\"{{'street': 'Douglas Extension', \
'suite': 'Suite 847', 'city': 'McKenziehaven', 'zipcode': '59590-4157', \
'geo': {{'lat': '-68.6102', 'lng': '-47.0653'}}}}\",,ramiro.info,{ROMAGUERA}"
        ),
    ];
    let mut csv = lines.join("\n");
    csv.push('\n');
    csv
}

/// A well-formed users line with the given identity fields
pub fn user_line(id: u32, username: &str, phone: &str) -> String {
    format!(
        "{id},Agent {id},{username},agent{id}@example.org,\"{{'street': 'S', 'suite': 'A', \
'city': 'C', 'zipcode': '00000', 'geo': {{'lat': '1.5', 'lng': '2.5'}}}}\",{phone},\
example.org,{ROMAGUERA}"
    )
}

fn null_values() -> Vec<String> {
    DEFAULT_NULL_VALUES.iter().map(|s| s.to_string()).collect()
}

/// Land the fixtures in a fresh staging database
pub fn stage() -> (StagingDb, RawTables) {
    stage_with_users(&users_csv())
}

/// Land the bookings fixture and the given users text
pub fn stage_with_users(users: &str) -> (StagingDb, RawTables) {
    let db = StagingDb::memory().expect("staging database should open");
    let nulls = null_values();
    let bookings = land_delimited(&db, bookings_csv().as_bytes(), BOOKINGS_TABLE, b',', &nulls)
        .expect("bookings fixture should land");
    let users = land_delimited(&db, users.as_bytes(), USERS_TABLE, b',', &nulls)
        .expect("users fixture should land");
    (db, RawTables::new(bookings, users))
}

/// A column rendered as text, in table order
pub fn column(db: &StagingDb, table: &str, column: &str) -> Vec<Option<String>> {
    let mut stmt = db
        .connection()
        .prepare(&format!(
            "SELECT CAST({} AS VARCHAR) FROM {}",
            quote_ident(column),
            quote_ident(table)
        ))
        .expect("column query should prepare");
    stmt.query_map([], |row| row.get(0))
        .expect("column query should run")
        .collect::<Result<Vec<_>, _>>()
        .expect("column values should read")
}

/// Present values of a column; panics on a missing one
pub fn texts(db: &StagingDb, table: &str, name: &str) -> Vec<String> {
    column(db, table, name)
        .into_iter()
        .map(|v| v.unwrap_or_else(|| panic!("{table}.{name} has a missing value")))
        .collect()
}
