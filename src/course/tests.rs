use super::*;
use serde_json::json;

fn session(date: &str, start: &str, end: &str, tipo_sede: &str) -> Sessione {
    Sessione {
        data_completa: date.to_string(),
        ora_inizio: start.to_string(),
        ora_fine: end.to_string(),
        tipo_sede: tipo_sede.to_string(),
        ..Default::default()
    }
}

#[test]
fn test_normalize_numbers_sessions_positionally() {
    let mut course = CourseData {
        moduli: vec![Modulo {
            sessioni: vec![
                session("10/03/2025", "09:00", "13:00", "FAD"),
                session("11/03/2025", "09:00", "13:00", "Aula"),
                session("12/03/2025", "09:00", "13:00", "Aula"),
            ],
            ..Default::default()
        }],
        ..Default::default()
    };
    course.moduli[0].sessioni[2].numero = 42;

    normalize(&mut course);

    let modulo = &course.moduli[0];
    let numbers: Vec<u32> = modulo.sessioni.iter().map(|s| s.numero).collect();
    assert_eq!(numbers, vec![1, 2, 3]);
    assert!(modulo.sessioni[0].is_fad);
    assert_eq!(modulo.sessioni_presenza.len(), 2);
    assert_eq!(modulo.sessioni_presenza[1].numero, 2);
    assert_eq!(modulo.sessioni_presenza[1].data_completa, "12/03/2025");
    assert_eq!(modulo.data_inizio, "10/03/2025");
    assert_eq!(modulo.data_fine, "12/03/2025");
    assert_eq!(course.corso.tipo, TipoCorso::Misto);
    assert_eq!(course.corso.anno, "2025");
}

#[test]
fn test_normalize_decomposes_dates() {
    let mut s = session("3/3/2025", "09:00", "13:00", "");
    fill_calendar_fields(&mut s);
    assert_eq!(s.data_completa, "03/03/2025");
    assert_eq!(s.giorno, "03");
    assert_eq!(s.mese, "marzo");
    assert_eq!(s.mese_numero, "03");
    assert_eq!(s.anno, "2025");
    assert_eq!(s.giorno_settimana, "lunedì");
}

#[test]
fn test_normalize_is_idempotent() {
    let course = CourseData {
        corso: Corso {
            capienza: "12/20".to_string(),
            ..Default::default()
        },
        moduli: vec![Modulo {
            sessioni: vec![session("10/03/2025", "09:00", "18:00", "online")],
            ..Default::default()
        }],
        ..Default::default()
    };
    let once = course.normalized();
    let twice = once.clone().normalized();
    assert_eq!(once, twice);
    assert_eq!(once.corso.capienza_numero, 12);
    assert_eq!(once.corso.capienza_totale, 20);
}

#[test]
fn test_course_dates_fall_back_to_modules() {
    let course = CourseData {
        moduli: vec![
            Modulo {
                data_inizio: "01/02/2025".to_string(),
                data_fine: "10/02/2025".to_string(),
                ..Default::default()
            },
            Modulo {
                data_inizio: "11/02/2025".to_string(),
                data_fine: "20/02/2025".to_string(),
                ..Default::default()
            },
        ],
        ..Default::default()
    };
    assert_eq!(course.data_inizio(), "01/02/2025");
    assert_eq!(course.data_fine(), "20/02/2025");
}

#[test]
fn test_scoped_to_module_overrides_course_fields() {
    let course = CourseData {
        corso: Corso {
            id: "C-1".to_string(),
            data_inizio: "01/02/2025".to_string(),
            ore_totali: "40".to_string(),
            ..Default::default()
        },
        moduli: vec![
            Modulo {
                titolo: "Primo".to_string(),
                ..Default::default()
            },
            Modulo {
                titolo: "Secondo".to_string(),
                data_inizio: "11/02/2025".to_string(),
                ore_totali: "16".to_string(),
                ..Default::default()
            },
        ],
        ..Default::default()
    };

    let scoped = course.scoped_to_module(1).unwrap();
    assert_eq!(scoped.moduli.len(), 1);
    assert_eq!(scoped.moduli[0].titolo, "Secondo");
    assert_eq!(scoped.corso.data_inizio, "11/02/2025");
    assert_eq!(scoped.corso.ore_totali, "16");
    assert_eq!(scoped.corso.id, "C-1");
    assert!(course.scoped_to_module(2).is_none());
}

#[test]
fn test_module_identifier_prefers_section_id() {
    let modulo = Modulo {
        id: "123".to_string(),
        id_sezione: "S-9".to_string(),
        ..Default::default()
    };
    assert_eq!(modulo.identifier(), "S-9");

    let modulo = Modulo {
        id: "123".to_string(),
        ..Default::default()
    };
    assert_eq!(modulo.identifier(), "123");
}

#[test]
fn test_from_extraction_is_lenient() {
    let raw = json!({
        "corso": { "id": 4521, "titolo": "Sicurezza sul lavoro", "tipo": "FAD", "capienza": "3/15", "id_sezione": "X-0" },
        "moduli": [{
            "id": "77",
            "id_sezione": "S-1",
            "titolo": "Modulo base",
            "argomenti": ["Normativa", " ", "Rischi"],
            "sessioni": [
                { "data": "10/03/2025", "ora_inizio": "09:00", "ora_fine": "13:00", "tipo_sede": "FAD" }
            ]
        }],
        "partecipanti": [
            { "nome": "Anna", "cognome": "Verdi", "codice_fiscale": "vrdnna90a41h501x", "benefits": "si" },
            { "nome": "Luca", "cognome": "Neri", "email": null }
        ],
        "supervisore": { "nome": "Paolo" }
    });

    let course = CourseData::from_extraction_json(raw).unwrap();
    assert_eq!(course.corso.id, "4521");
    assert_eq!(course.corso.tipo, TipoCorso::Fad);
    assert_eq!(course.corso.capienza_totale, 15);
    assert_eq!(course.moduli[0].identifier(), "S-1");
    assert_eq!(course.moduli[0].argomenti, vec!["Normativa", "Rischi"]);
    assert_eq!(course.moduli[0].sessioni[0].numero, 1);
    assert_eq!(course.moduli[0].sessioni[0].mese, "marzo");
    assert!(course.moduli[0].sessioni[0].is_fad);
    assert_eq!(course.partecipanti[0].codice_fiscale, "VRDNNA90A41H501X");
    assert!(course.partecipanti[0].benefits);
    assert_eq!(course.partecipanti[1].email, None);
    assert_eq!(course.supervisore.nome, "Paolo");
}

#[test]
fn test_from_extraction_adopts_single_section_id() {
    let raw = json!({
        "corso": { "id_sezione": "S-5" },
        "moduli": [{ "id": "77" }]
    });
    let course = CourseData::from_extraction_json(raw).unwrap();
    assert_eq!(course.moduli[0].identifier(), "S-5");
}

#[test]
fn test_persona_name_parts() {
    let persona = Persona {
        nome_completo: "Maria Grazia Bianchi".to_string(),
        ..Default::default()
    };
    assert_eq!(persona.name_parts(), ("Maria".to_string(), "Grazia Bianchi".to_string()));
    assert_eq!(persona.display_name(), "Maria Grazia Bianchi");
}
