mod fixtures;

use fixtures::{Course, STUDENT_COURSES, Student};
use relink::prelude::*;
use relink::Store;
use std::sync::Arc;

fn course(title: &str) -> Ref<Course> {
    new_ref(Course {
        title: title.to_string(),
        ..Course::default()
    })
}

fn student_with_courses(name: &str, courses: &[&Ref<Course>]) -> Ref<Student> {
    let student = new_ref(Student {
        name: name.to_string(),
        ..Student::default()
    });
    for c in courses {
        student.write().unwrap().courses.push(Arc::clone(c));
    }
    student
}

fn link_keys(db: &relink::Db<relink::MemoryStore>, student: &Ref<Student>) -> Vec<Key> {
    let key = student.read().unwrap().key();
    let mut keys = db.store().link_rows(&STUDENT_COURSES, &key).unwrap();
    keys.sort();
    keys
}

#[test]
fn enrollment_round_trip_reads_from_both_sides() {
    let db = fixtures::school_db();
    let math = course("math");
    let art = course("art");
    let student = student_with_courses("ada", &[&math, &art]);
    db.insert_with_children(&student, true).unwrap();

    assert_eq!(link_keys(&db, &student).len(), 2);

    // Far side: hydrating a course finds its students through the same
    // link table with the columns flipped.
    let math_key = math.read().unwrap().key();
    let loaded = db.get_with_children::<Course>(&math_key, true).unwrap().unwrap();
    let guard = loaded.read().unwrap();
    assert_eq!(guard.students.len(), 1);
    assert_eq!(guard.students[0].read().unwrap().name, "ada");
}

#[test]
fn reconcile_adds_exactly_the_missing_link() {
    let db = fixtures::school_db();
    let math = course("math");
    let art = course("art");
    let student = student_with_courses("ada", &[&math, &art]);
    db.insert_with_children(&student, true).unwrap();
    let before = link_keys(&db, &student);

    let gym = course("gym");
    student.write().unwrap().courses.push(Arc::clone(&gym));
    db.insert_or_replace_with_children(&student, true).unwrap();

    let after = link_keys(&db, &student);
    assert_eq!(after.len(), 3);
    // The two original links survived untouched.
    for key in before {
        assert!(after.contains(&key));
    }
}

#[test]
fn reconcile_deletes_exactly_the_stale_links() {
    let db = fixtures::school_db();
    let math = course("math");
    let art = course("art");
    let gym = course("gym");
    let student = student_with_courses("ada", &[&math, &art, &gym]);
    db.insert_with_children(&student, true).unwrap();

    student.write().unwrap().courses.retain(|c| Arc::ptr_eq(c, &gym));
    db.insert_or_replace_with_children(&student, true).unwrap();

    assert_eq!(link_keys(&db, &student), vec![gym.read().unwrap().key()]);
    // Dropped membership never deletes the far records themselves.
    assert_eq!(db.store().all::<Course>().unwrap().len(), 3);
}

#[test]
fn cascaded_course_write_keeps_other_students_links() {
    let db = fixtures::school_db();
    let math = course("math");
    let ada = student_with_courses("ada", &[&math]);
    let bob = student_with_courses("bob", &[&math]);
    db.insert_with_children(&ada, true).unwrap();
    db.insert_with_children(&bob, true).unwrap();

    // Re-saving ada sweeps through math, whose own student list was never
    // loaded; bob's enrollment must survive.
    db.insert_or_replace_with_children(&ada, true).unwrap();

    assert_eq!(link_keys(&db, &ada).len(), 1);
    assert_eq!(link_keys(&db, &bob).len(), 1);
}

#[test]
fn deleting_a_student_clears_links_but_keeps_courses() {
    let db = fixtures::school_db();
    let math = course("math");
    let student = student_with_courses("ada", &[&math]);
    db.insert_with_children(&student, true).unwrap();
    let student_key = student.read().unwrap().key();

    db.delete_with_children(&student, true).unwrap();

    assert!(db.store().find::<Student>(&student_key).unwrap().is_none());
    assert!(
        db.store()
            .link_rows(&STUDENT_COURSES, &student_key)
            .unwrap()
            .is_empty()
    );
    assert_eq!(db.store().all::<Course>().unwrap().len(), 1);
}

#[test]
fn delete_all_ids_removes_rows_and_links() {
    let db = fixtures::school_db();
    let math = course("math");
    let ada = student_with_courses("ada", &[&math]);
    let bob = student_with_courses("bob", &[&math]);
    db.insert_all_with_children(&[Arc::clone(&ada), Arc::clone(&bob)], true)
        .unwrap();

    let ada_key = ada.read().unwrap().key();
    let bob_key = bob.read().unwrap().key();
    db.delete_all_ids::<Student>(&[ada_key.clone(), bob_key.clone()])
        .unwrap();

    assert!(db.store().all::<Student>().unwrap().is_empty());
    assert!(db.store().link_rows(&STUDENT_COURSES, &ada_key).unwrap().is_empty());
    assert!(db.store().link_rows(&STUDENT_COURSES, &bob_key).unwrap().is_empty());
    // Courses are untouched.
    assert_eq!(db.store().all::<Course>().unwrap().len(), 1);
}
