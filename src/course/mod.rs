//! Course data model.
//!
//! `CourseData` is the read-only snapshot every generation run works on.
//! This module also owns the normalization of derived fields (positional
//! numbering, decomposed dates, in-person session view) and the lenient
//! initialization from a raw extraction object.

pub mod extraction;
pub mod handlers;
pub mod model;
pub mod validation;

#[cfg(test)]
mod tests;

pub use extraction::RawExtraction;
pub use model::{
    CourseData, Corso, Ente, FadSettings, Modulo, Partecipante, Persona, Sede, SedeAccreditata,
    Sessione, TipoCorso,
};
pub use validation::{validate_course, ValidationWarning, ValidationWarnings};

use chrono::Datelike;

use crate::documents::common::{italian_month_name, italian_weekday_name, parse_italian_date};

const FAD_VENUE_MARKERS: [&str; 5] = ["fad", "online", "e-learning", "elearning", "remot"];

/// Whether a venue-type tag denotes distance learning.
pub fn is_fad_venue(tipo_sede: &str) -> bool {
    let tag = tipo_sede.trim().to_lowercase();
    FAD_VENUE_MARKERS.iter().any(|marker| tag.contains(marker))
}

/// Parse a capacity string `"N/M"` into numerator and denominator.
pub fn parse_capienza(value: &str) -> Option<(u32, u32)> {
    let (num, den) = value.split_once('/')?;
    Some((num.trim().parse().ok()?, den.trim().parse().ok()?))
}

impl CourseData {
    /// Consume and return a normalized copy.
    pub fn normalized(mut self) -> Self {
        normalize(&mut self);
        self
    }
}

/// Fill in every derived field of a course in place.
///
/// Idempotent: running it twice yields the same value.
pub fn normalize(course: &mut CourseData) {
    if let Some((num, den)) = parse_capienza(&course.corso.capienza) {
        course.corso.capienza_numero = num;
        course.corso.capienza_totale = den;
    }

    for modulo in &mut course.moduli {
        normalize_module(modulo);
    }

    if course.corso.anno.trim().is_empty() {
        if let Some(date) = parse_italian_date(course.data_inizio()) {
            course.corso.anno = date.year().to_string();
        }
    }

    if course.corso.tipo == TipoCorso::NonSpecificato {
        let total = course.all_sessions().count();
        let fad = course.all_sessions().filter(|s| s.is_fad).count();
        course.corso.tipo = match (total, fad) {
            (0, _) => TipoCorso::NonSpecificato,
            (t, f) if t == f => TipoCorso::Fad,
            (_, 0) => TipoCorso::Presenza,
            _ => TipoCorso::Misto,
        };
    }
}

fn normalize_module(modulo: &mut Modulo) {
    let default_venue = modulo.tipo_sede.clone();
    for (idx, session) in modulo.sessioni.iter_mut().enumerate() {
        session.numero = idx as u32 + 1;
        if session.tipo_sede.trim().is_empty() {
            session.tipo_sede = default_venue.clone();
        }
        session.is_fad = session.is_fad || is_fad_venue(&session.tipo_sede);
        fill_calendar_fields(session);
    }

    if !modulo.sessioni.is_empty() {
        modulo.sessioni_presenza = modulo
            .sessioni
            .iter()
            .filter(|s| !s.is_fad)
            .cloned()
            .collect();
    }
    for (idx, session) in modulo.sessioni_presenza.iter_mut().enumerate() {
        session.numero = idx as u32 + 1;
        fill_calendar_fields(session);
    }

    if modulo.data_inizio.trim().is_empty() {
        if let Some(first) = modulo.sessioni.first() {
            modulo.data_inizio = first.data_completa.clone();
        }
    }
    if modulo.data_fine.trim().is_empty() {
        if let Some(last) = modulo.sessioni.last() {
            modulo.data_fine = last.data_completa.clone();
        }
    }
}

/// Decompose `data_completa` into day, month, month number, year and
/// weekday name.
pub fn fill_calendar_fields(session: &mut Sessione) {
    let Some(date) = parse_italian_date(&session.data_completa) else {
        return;
    };
    session.data_completa = date.format("%d/%m/%Y").to_string();
    session.giorno = format!("{:02}", date.day());
    session.mese = italian_month_name(date.month()).to_string();
    session.mese_numero = format!("{:02}", date.month());
    session.anno = date.year().to_string();
    session.giorno_settimana = italian_weekday_name(date).to_string();
}
