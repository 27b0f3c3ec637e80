//! Fixed templates for the offline responder: time-of-day greeting,
//! owner honorific, Indonesian-formatted timestamps.

use crate::persona::{Gender, Owner};
use chrono::{DateTime, Datelike, Local, Timelike};

const HARI: [&str; 7] = [
    "Minggu", "Senin", "Selasa", "Rabu", "Kamis", "Jumat", "Sabtu",
];
const BULAN: [&str; 12] = [
    "Januari",
    "Februari",
    "Maret",
    "April",
    "Mei",
    "Juni",
    "Juli",
    "Agustus",
    "September",
    "Oktober",
    "November",
    "Desember",
];

/// Greeting bands by local hour: 4, 11, 15, 18.
pub fn greeting_for_hour(hour: u32) -> &'static str {
    if (4..11).contains(&hour) {
        "*Selamat pagi*"
    } else if (11..15).contains(&hour) {
        "*Selamat siang*"
    } else if (15..18).contains(&hour) {
        "*Selamat sore*"
    } else {
        "*Selamat malam*"
    }
}

pub fn greeting_now() -> &'static str {
    greeting_for_hour(Local::now().hour())
}

/// `Mbak` for a female owner, `Mas` otherwise.
pub fn owner_call(owner: &Owner) -> String {
    let honorific = match owner.gender {
        Some(Gender::Female) => "Mbak",
        _ => "Mas",
    };
    format!("{honorific} {}", owner.name)
}

/// Long form: `Kamis, 7 Agustus 2026 pukul 14.30.15`.
pub fn format_waktu(dt: &DateTime<Local>) -> String {
    let hari = HARI[dt.weekday().num_days_from_sunday() as usize];
    let bulan = BULAN[dt.month0() as usize];
    format!(
        "{hari}, {} {bulan} {} pukul {:02}.{:02}.{:02}",
        dt.day(),
        dt.year(),
        dt.hour(),
        dt.minute(),
        dt.second()
    )
}

/// Short form: `7/8/2026 14.30.15`.
pub fn format_waktu_short(dt: &DateTime<Local>) -> String {
    format!(
        "{}/{}/{} {:02}.{:02}.{:02}",
        dt.day(),
        dt.month(),
        dt.year(),
        dt.hour(),
        dt.minute(),
        dt.second()
    )
}

pub fn direct_reply(
    greeting: &str,
    owner_call: &str,
    reason: &str,
    time: &str,
    assistant: &str,
) -> String {
    format!(
        "{greeting}, \n\n> Saat ini {owner_call} sedang offline. \nReason: {reason}. \nSejak: {time} \nTinggalkan pesan dibawah ini. \n\nBot: *{assistant}*"
    )
}

pub fn group_reply(
    greeting: &str,
    sender_id: &str,
    owner_call: &str,
    reason: &str,
    time: &str,
    assistant: &str,
) -> String {
    format!(
        "{greeting} \n*Halo* @{sender_id} \n\n> Saat ini {owner_call} sedang offline. \n*Reason:* {reason}. \n*Sejak:* {time}. \nTinggalkan pesan di bawah ini. \n\nBot:*{assistant}*"
    )
}
