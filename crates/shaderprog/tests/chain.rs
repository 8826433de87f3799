use shaderprog::{compile, Rgba, ShaderError, ShaderInstance, UniformStore, UniformType, UniformValue};

const PASS_THROUGH: &str = "
uniform shader child;
half4 main(float2 p) {
    return child.eval(p);
}";

const RESOLUTION_PROBE: &str = "
uniform float2 iResolution;
half4 main(float2 p) {
    return half4(p / iResolution, 0.0, 1.0);
}";

#[test]
fn program_cannot_reference_itself() {
    let program = compile(PASS_THROUGH).unwrap();
    let mut store = UniformStore::new(&program);
    let err = store
        .set_shader_reference("child", ShaderInstance::new(program.clone()))
        .unwrap_err();
    assert_eq!(
        err,
        ShaderError::CyclicShaderReference {
            program_id: program.id()
        }
    );
    assert_eq!(store.child("child"), Ok(None));
}

#[test]
fn transitive_cycles_are_rejected_before_mutation() {
    let a = compile(PASS_THROUGH).unwrap();
    let b = compile(PASS_THROUGH).unwrap();

    let mut b_store = UniformStore::new(&b);
    b_store
        .set_shader_reference("child", ShaderInstance::new(a.clone()))
        .unwrap();
    let b_instance = ShaderInstance::with_uniforms(b.clone(), b_store).unwrap();

    let mut a_store = UniformStore::new(&a);
    let before = a_store.clone();
    let err = a_store.set_shader_reference("child", b_instance).unwrap_err();
    assert_eq!(err, ShaderError::CyclicShaderReference { program_id: a.id() });
    assert_eq!(a_store, before);
}

#[test]
fn chained_shaders_see_the_parent_resolution_argument() {
    let parent = compile(PASS_THROUGH).unwrap();
    let probe = compile(RESOLUTION_PROBE).unwrap();

    let mut child = ShaderInstance::new(probe);
    child.set("iResolution", UniformValue::Vector2([4.0, 2.0])).unwrap();

    let mut store = UniformStore::new(&parent);
    store.set_shader_reference("child", child).unwrap();
    let color = parent.evaluate([1.0, 1.0], [4.0, 2.0], &store);
    assert_eq!(color, Rgba::new(0.25, 0.5, 0.0, 1.0));
}

#[test]
fn two_level_chain_evaluates_through_both_parents() {
    let outer = compile(PASS_THROUGH).unwrap();
    let middle = compile(PASS_THROUGH).unwrap();
    let leaf = compile("half4 main(float2 p) { return half4(0.0, 1.0, 0.0, 1.0); }").unwrap();

    let mut middle_instance = ShaderInstance::new(middle);
    middle_instance
        .set("child", UniformValue::Shader(Some(ShaderInstance::new(leaf))))
        .unwrap();

    let mut store = UniformStore::new(&outer);
    store.set_shader_reference("child", middle_instance).unwrap();
    assert_eq!(
        outer.evaluate([0.0, 0.0], [1.0, 1.0], &store),
        Rgba::new(0.0, 1.0, 0.0, 1.0)
    );
    assert_eq!(store.children().count(), 1);
}

#[test]
fn child_store_stays_reachable_for_updates() {
    let parent = compile(PASS_THROUGH).unwrap();
    let probe = compile(RESOLUTION_PROBE).unwrap();

    let mut store = UniformStore::new(&parent);
    store
        .set_shader_reference("child", ShaderInstance::new(probe))
        .unwrap();
    store
        .child_mut("child")
        .unwrap()
        .expect("child bound")
        .set("iResolution", UniformValue::Vector2([2.0, 2.0]))
        .unwrap();

    let color = parent.evaluate([1.0, 1.0], [2.0, 2.0], &store);
    assert_eq!(color, Rgba::new(0.5, 0.5, 0.0, 1.0));
}

#[test]
fn propagate_reaches_matching_children_only() {
    let parent = compile(
        "uniform float2 iResolution;\nuniform shader child;\nhalf4 main(float2 p) { return child.eval(p); }",
    )
    .unwrap();
    let probe = compile(RESOLUTION_PROBE).unwrap();

    let mut instance = ShaderInstance::new(parent);
    instance
        .set("child", UniformValue::Shader(Some(ShaderInstance::new(probe))))
        .unwrap();

    let applied = instance.propagate("iResolution", &UniformValue::Vector2([8.0, 8.0]));
    assert_eq!(applied, 2);
    let applied = instance.propagate("iResolution", &UniformValue::Scalar(1.0));
    assert_eq!(applied, 0);

    let color = instance.evaluate([4.0, 2.0], [8.0, 8.0]);
    assert_eq!(color, Rgba::new(0.5, 0.25, 0.0, 1.0));
}

#[test]
fn store_from_another_program_is_refused() {
    let a = compile(PASS_THROUGH).unwrap();
    let b = compile(RESOLUTION_PROBE).unwrap();
    let err = ShaderInstance::with_uniforms(a.clone(), UniformStore::new(&b)).unwrap_err();
    assert_eq!(
        err,
        ShaderError::StoreMismatch {
            expected: a.id(),
            actual: b.id()
        }
    );
}

#[test]
fn shader_reference_type_is_enforced() {
    let parent = compile(PASS_THROUGH).unwrap();
    let mut store = UniformStore::new(&parent);
    let err = store.set_scalar("child", 1.0).unwrap_err();
    assert_eq!(
        err,
        ShaderError::UniformTypeMismatch {
            name: "child".into(),
            expected: UniformType::Shader,
            actual: UniformType::Scalar,
        }
    );
}
